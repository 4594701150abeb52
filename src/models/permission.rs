use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::authz::codec;
use crate::errors::AuthzError;
use crate::models::RoleScope;

// =============================================================================
// ACTION
// =============================================================================

/// One of the four actions a role can grant on a resource type.
///
/// Declaration order is the canonical encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionAction {
    Create,
    Read,
    Update,
    Delete,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 4] = [
        PermissionAction::Create,
        PermissionAction::Read,
        PermissionAction::Update,
        PermissionAction::Delete,
    ];

    /// Single-character code used in grant strings.
    pub fn code(self) -> char {
        match self {
            PermissionAction::Create => 'C',
            PermissionAction::Read => 'R',
            PermissionAction::Update => 'U',
            PermissionAction::Delete => 'D',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'C' => Some(PermissionAction::Create),
            'R' => Some(PermissionAction::Read),
            'U' => Some(PermissionAction::Update),
            'D' => Some(PermissionAction::Delete),
            _ => None,
        }
    }

    /// Bit used both in-memory and in the packed storage encoding.
    pub fn mask(self) -> u8 {
        match self {
            PermissionAction::Create => 0b1000,
            PermissionAction::Read => 0b0100,
            PermissionAction::Update => 0b0010,
            PermissionAction::Delete => 0b0001,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionAction::Create => "CREATE",
            PermissionAction::Read => "READ",
            PermissionAction::Update => "UPDATE",
            PermissionAction::Delete => "DELETE",
        }
    }
}

impl fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// GRANT
// =============================================================================

/// The set of actions a role permits on one resource type.
///
/// Serialized as its canonical code string, e.g. `"CRUD"` or `"R"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionGrant {
    bits: u8,
}

impl PermissionGrant {
    pub const FULL_BITS: u8 = 0b1111;

    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub const fn all() -> Self {
        Self {
            bits: Self::FULL_BITS,
        }
    }

    pub fn of(actions: impl IntoIterator<Item = PermissionAction>) -> Self {
        actions.into_iter().collect()
    }

    pub(crate) fn from_bits(bits: u8) -> Option<Self> {
        (bits <= Self::FULL_BITS).then_some(Self { bits })
    }

    pub(crate) fn bits(self) -> u8 {
        self.bits
    }

    pub fn contains(self, action: PermissionAction) -> bool {
        self.bits & action.mask() != 0
    }

    pub fn insert(&mut self, action: PermissionAction) {
        self.bits |= action.mask();
    }

    #[must_use]
    pub fn with(mut self, action: PermissionAction) -> Self {
        self.insert(action);
        self
    }

    #[must_use]
    pub fn union(self, other: PermissionGrant) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// True when every action in `required` is also in `self`.
    pub fn covers(self, required: PermissionGrant) -> bool {
        self.bits & required.bits == required.bits
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Actions in canonical order.
    pub fn iter(self) -> impl Iterator<Item = PermissionAction> {
        PermissionAction::ALL
            .into_iter()
            .filter(move |action| self.contains(*action))
    }
}

impl FromIterator<PermissionAction> for PermissionGrant {
    fn from_iter<I: IntoIterator<Item = PermissionAction>>(iter: I) -> Self {
        let mut grant = PermissionGrant::empty();
        for action in iter {
            grant.insert(action);
        }
        grant
    }
}

impl From<PermissionAction> for PermissionGrant {
    fn from(action: PermissionAction) -> Self {
        PermissionGrant::empty().with(action)
    }
}

impl BitOr for PermissionGrant {
    type Output = PermissionGrant;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for PermissionGrant {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode(self.iter()))
    }
}

impl FromStr for PermissionGrant {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        codec::decode(s)
    }
}

impl TryFrom<String> for PermissionGrant {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        codec::decode(&value)
    }
}

impl From<PermissionGrant> for String {
    fn from(value: PermissionGrant) -> Self {
        value.to_string()
    }
}

// =============================================================================
// RESOURCE TYPE
// =============================================================================

/// A class of protectable sub-resource within a scope.
///
/// The declaration order fixes each type's packed storage base, so new
/// variants must be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionResourceType {
    Definition,
    GatewayDefinition,
    Plan,
    Subscription,
    Member,
    Metadata,
    Documentation,
    Analytics,
    Log,
    Health,
    Event,
    Audit,
    Rating,
    RatingAnswer,
    Notification,
    Message,
    Alert,
    Reviews,
    Instance,
    Group,
    Tag,
    Tenant,
    Api,
    Application,
    Category,
    Dictionary,
    Theme,
    QualityRule,
    Settings,
    Users,
    Role,
    Environment,
    Integration,
    Entrypoint,
}

impl PermissionResourceType {
    pub const ALL: [PermissionResourceType; 34] = [
        PermissionResourceType::Definition,
        PermissionResourceType::GatewayDefinition,
        PermissionResourceType::Plan,
        PermissionResourceType::Subscription,
        PermissionResourceType::Member,
        PermissionResourceType::Metadata,
        PermissionResourceType::Documentation,
        PermissionResourceType::Analytics,
        PermissionResourceType::Log,
        PermissionResourceType::Health,
        PermissionResourceType::Event,
        PermissionResourceType::Audit,
        PermissionResourceType::Rating,
        PermissionResourceType::RatingAnswer,
        PermissionResourceType::Notification,
        PermissionResourceType::Message,
        PermissionResourceType::Alert,
        PermissionResourceType::Reviews,
        PermissionResourceType::Instance,
        PermissionResourceType::Group,
        PermissionResourceType::Tag,
        PermissionResourceType::Tenant,
        PermissionResourceType::Api,
        PermissionResourceType::Application,
        PermissionResourceType::Category,
        PermissionResourceType::Dictionary,
        PermissionResourceType::Theme,
        PermissionResourceType::QualityRule,
        PermissionResourceType::Settings,
        PermissionResourceType::Users,
        PermissionResourceType::Role,
        PermissionResourceType::Environment,
        PermissionResourceType::Integration,
        PermissionResourceType::Entrypoint,
    ];

    pub fn as_str(self) -> &'static str {
        use PermissionResourceType::*;
        match self {
            Definition => "DEFINITION",
            GatewayDefinition => "GATEWAY_DEFINITION",
            Plan => "PLAN",
            Subscription => "SUBSCRIPTION",
            Member => "MEMBER",
            Metadata => "METADATA",
            Documentation => "DOCUMENTATION",
            Analytics => "ANALYTICS",
            Log => "LOG",
            Health => "HEALTH",
            Event => "EVENT",
            Audit => "AUDIT",
            Rating => "RATING",
            RatingAnswer => "RATING_ANSWER",
            Notification => "NOTIFICATION",
            Message => "MESSAGE",
            Alert => "ALERT",
            Reviews => "REVIEWS",
            Instance => "INSTANCE",
            Group => "GROUP",
            Tag => "TAG",
            Tenant => "TENANT",
            Api => "API",
            Application => "APPLICATION",
            Category => "CATEGORY",
            Dictionary => "DICTIONARY",
            Theme => "THEME",
            QualityRule => "QUALITY_RULE",
            Settings => "SETTINGS",
            Users => "USERS",
            Role => "ROLE",
            Environment => "ENVIRONMENT",
            Integration => "INTEGRATION",
            Entrypoint => "ENTRYPOINT",
        }
    }

    /// Base value of this type in the packed storage encoding.
    pub fn mask_base(self) -> i64 {
        1000 + 100 * self as i64
    }

    pub(crate) fn from_mask_base(base: i64) -> Option<Self> {
        if base < 1000 || base % 100 != 0 {
            return None;
        }
        let index = usize::try_from((base - 1000) / 100).ok()?;
        Self::ALL.get(index).copied()
    }

    /// Whether the built-in roles of `scope` cover this type.
    pub fn applies_to(self, scope: RoleScope) -> bool {
        use PermissionResourceType::*;
        match scope {
            RoleScope::Api => matches!(
                self,
                Definition
                    | GatewayDefinition
                    | Plan
                    | Subscription
                    | Member
                    | Metadata
                    | Documentation
                    | Analytics
                    | Log
                    | Health
                    | Event
                    | Audit
                    | Rating
                    | RatingAnswer
                    | Notification
                    | Message
                    | Alert
                    | Reviews
            ),
            RoleScope::Application => matches!(
                self,
                Definition
                    | Member
                    | Analytics
                    | Log
                    | Subscription
                    | Notification
                    | Alert
                    | Metadata
                    | Documentation
            ),
            RoleScope::Integration => matches!(self, Definition | Member),
            RoleScope::Group => matches!(self, Member),
            RoleScope::Environment => matches!(
                self,
                Instance
                    | Group
                    | Tag
                    | Tenant
                    | Api
                    | Application
                    | Documentation
                    | Category
                    | Audit
                    | Dictionary
                    | Theme
                    | QualityRule
                    | Metadata
                    | Notification
                    | Alert
                    | Integration
                    | Settings
            ),
            RoleScope::Organization => matches!(
                self,
                Users | Role | Environment | Tag | Tenant | Audit | Settings | Entrypoint
            ),
            RoleScope::Portal => {
                matches!(self, Documentation | Metadata | Theme | Settings | Category)
            }
        }
    }

    pub fn for_scope(scope: RoleScope) -> impl Iterator<Item = PermissionResourceType> {
        Self::ALL
            .into_iter()
            .filter(move |resource_type| resource_type.applies_to(scope))
    }
}

impl fmt::Display for PermissionResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionResourceType {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|resource_type| resource_type.as_str() == s)
            .ok_or_else(|| AuthzError::UnknownResourceType(s.to_string()))
    }
}
