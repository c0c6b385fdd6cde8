use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Message attached to a successful create.
pub const CREATED_MSG: &str = "Создано!";
/// Message attached to a successful update or flag change.
pub const UPDATED_MSG: &str = "Обновлено!";
/// Message attached to a successful hard delete.
pub const DELETED_MSG: &str = "Удалено!";

// --- Accounts ---

/// AccountKind
///
/// Selects one of the two parallel credential tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AccountKind {
    Admin,
    User,
}

impl AccountKind {
    pub const ALL: [AccountKind; 2] = [AccountKind::Admin, AccountKind::User];

    /// Route and storage tag ("admin" / "user").
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Admin => "admin",
            AccountKind::User => "user",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            AccountKind::Admin => "admins",
            AccountKind::User => "users",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(AccountKind::Admin),
            "user" => Some(AccountKind::User),
            _ => None,
        }
    }
}

/// Account
///
/// A row of either the `admins` or the `users` table. Users never carry the superadmin
/// flag; the column is synthesized as `false` when reading them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Account {
    pub id: i64,
    pub username: String,
    // Argon2id PHC string. Never leaves the server.
    #[serde(default, skip_serializing)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password_hash: String,
    // The most recently issued session token for this account.
    pub token: Option<String>,
    pub is_active: bool,
    pub is_superadmin: bool,
    pub is_deleted: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewAccount
///
/// Insert payload for the credential store, already validated and hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub is_superadmin: bool,
}

/// AccountRequest
///
/// Body of the create and update endpoints for admins, users and the superadmin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AccountRequest {
    #[schema(example = "curator")]
    pub username: String,
    #[schema(example = "s3cret")]
    pub password: String,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// Issued on successful login. `token` is sent back as `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub id: i64,
    pub username: String,
    pub token: String,
    pub is_superadmin: bool,
}

/// DeleteFlag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteFlag {
    pub is_deleted: bool,
}

/// ActiveFlag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActiveFlag {
    pub is_active: bool,
}

/// Updated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Updated {
    pub updated: bool,
}

/// Envelope
///
/// Wraps a success body with the human-readable `msg` field clients display.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    #[serde(flatten)]
    pub body: T,
    pub msg: &'static str,
}

impl<T> Envelope<T> {
    pub fn new(body: T, msg: &'static str) -> Self {
        Self { body, msg }
    }
}

/// Message
///
/// A bare `{ "msg": ... }` body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Message {
    pub msg: &'static str,
}

// --- Sessions ---

/// Session
///
/// The server-side record a bearer token names. Deleting the row revokes the token.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub kind: AccountKind,
    pub account_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// --- Taxonomy ---

/// Level
///
/// One rank of the fixed taxonomy chain, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Level {
    Department,
    Class,
    Subclass,
    Supersubclass,
    Order,
    Suborder,
    Family,
}

impl Level {
    pub const ALL: [Level; 7] = [
        Level::Department,
        Level::Class,
        Level::Subclass,
        Level::Supersubclass,
        Level::Order,
        Level::Suborder,
        Level::Family,
    ];

    /// Singular route segment, e.g. `create-class`.
    pub fn slug(self) -> &'static str {
        match self {
            Level::Department => "department",
            Level::Class => "class",
            Level::Subclass => "subclass",
            Level::Supersubclass => "supersubclass",
            Level::Order => "order",
            Level::Suborder => "suborder",
            Level::Family => "family",
        }
    }

    /// Plural form: list route segment, table name and nested JSON key.
    pub fn plural(self) -> &'static str {
        match self {
            Level::Department => "departments",
            Level::Class => "classes",
            Level::Subclass => "subclasses",
            Level::Supersubclass => "supersubclasses",
            Level::Order => "orders",
            Level::Suborder => "suborders",
            Level::Family => "families",
        }
    }

    pub fn parent(self) -> Option<Level> {
        match self {
            Level::Department => None,
            Level::Class => Some(Level::Department),
            Level::Subclass => Some(Level::Class),
            Level::Supersubclass => Some(Level::Subclass),
            Level::Order => Some(Level::Supersubclass),
            Level::Suborder => Some(Level::Order),
            Level::Family => Some(Level::Suborder),
        }
    }

    pub fn child(self) -> Option<Level> {
        match self {
            Level::Department => Some(Level::Class),
            Level::Class => Some(Level::Subclass),
            Level::Subclass => Some(Level::Supersubclass),
            Level::Supersubclass => Some(Level::Order),
            Level::Order => Some(Level::Suborder),
            Level::Suborder => Some(Level::Family),
            Level::Family => None,
        }
    }

    /// Foreign-key column pointing at the parent row. `None` for the root.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            Level::Department => None,
            Level::Class => Some("department_id"),
            Level::Subclass => Some("class_id"),
            Level::Supersubclass => Some("subclass_id"),
            Level::Order => Some("supersubclass_id"),
            Level::Suborder => Some("order_id"),
            Level::Family => Some("suborder_id"),
        }
    }

    /// Every level strictly below this one, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = Level> {
        std::iter::successors(self.child(), |level| level.child())
    }
}

/// Taxon
///
/// A row of any hierarchy table. `parent_id` is the level's foreign key and is `None`
/// only for departments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Taxon {
    pub id: i64,
    pub name_lt: String,
    pub name_ru: String,
    pub parent_id: Option<i64>,
    pub is_deleted: bool,
}

/// TaxonRequest
///
/// Create/update body for every level. The parent is named either by the level's own
/// foreign-key name (`department_id` for a class, `class_id` for a subclass, ...) or by the
/// generic `parent_id`. A key belonging to another level is rejected by the service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct TaxonRequest {
    #[schema(example = "Mammalia")]
    pub name_lt: String,
    #[schema(example = "Млекопитающие")]
    pub name_ru: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 1)]
    pub parent_id: Option<i64>,
    #[serde(flatten)]
    pub parent_keys: ParentKeys,
    #[serde(default)]
    pub is_deleted: bool,
}

/// ParentKeys
///
/// The level-specific parent keys a request may carry, as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub struct ParentKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersubclass_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suborder_id: Option<i64>,
}

impl ParentKeys {
    /// Each key paired with the column it names.
    pub fn entries(&self) -> [(&'static str, Option<i64>); 6] {
        [
            ("department_id", self.department_id),
            ("class_id", self.class_id),
            ("subclass_id", self.subclass_id),
            ("supersubclass_id", self.supersubclass_id),
            ("order_id", self.order_id),
            ("suborder_id", self.suborder_id),
        ]
    }
}

/// TaxonNode
///
/// A taxon with its eagerly loaded descendants. Serializes with the level's own
/// foreign-key name and nests children under the child level's plural key.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonNode {
    pub level: Level,
    pub taxon: Taxon,
    // `None` when the subtree was not loaded (e.g. create responses).
    pub children: Option<Vec<TaxonNode>>,
}

impl TaxonNode {
    pub fn leaf(level: Level, taxon: Taxon) -> Self {
        Self {
            level,
            taxon,
            children: None,
        }
    }
}

impl Serialize for TaxonNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.taxon.id)?;
        map.serialize_entry("name_lt", &self.taxon.name_lt)?;
        map.serialize_entry("name_ru", &self.taxon.name_ru)?;
        if let Some(column) = self.level.parent_column() {
            map.serialize_entry(column, &self.taxon.parent_id)?;
        }
        map.serialize_entry("is_deleted", &self.taxon.is_deleted)?;
        if let (Some(child), Some(children)) = (self.level.child(), &self.children) {
            map.serialize_entry(child.plural(), children)?;
        }
        map.end()
    }
}
