use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Every id created on this machine starts with this prefix until the remote store assigns a
/// real one.
pub const LOCAL_ID_PREFIX: &str = "local_";

pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

pub fn new_local_habit_id(now: DateTime<Utc>) -> String {
    format!("{LOCAL_ID_PREFIX}{}_{}", now.timestamp_millis(), random_suffix())
}

pub fn new_local_entry_id(now: DateTime<Utc>) -> String {
    format!("{LOCAL_ID_PREFIX}e_{}_{}", now.timestamp_millis(), random_suffix())
}

pub fn new_local_section_id(now: DateTime<Utc>) -> String {
    format!("{LOCAL_ID_PREFIX}section_{}", now.timestamp_millis())
}

fn random_suffix() -> u32 {
    rand::thread_rng().gen_range(0..10000)
}

/// Anything that takes part in last-write-wins reconciliation.
pub trait Record {
    fn id(&self) -> &str;

    /// Moment of the last known change. Records without any timestamp are treated as the oldest.
    fn last_modified(&self) -> Option<DateTime<Utc>>;
}

/// A trackable activity. Field order is the column order of exported files.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct Habit {
    #[serde(with = "id_ser")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "number_ser::deserialize_opt")]
    pub daily_goal: Option<f64>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "timestamp_ser::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp_ser::deserialize"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub local: bool,
}

impl Habit {
    pub fn unit_label(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }
}

impl Record for Habit {
    fn id(&self) -> &str {
        &self.id
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// One dated measurement against a habit. `habit_id` may point to a habit that no longer exists.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct Entry {
    #[serde(with = "id_ser")]
    pub id: String,
    #[serde(with = "id_ser")]
    pub habit_id: String,
    #[serde(deserialize_with = "number_ser::deserialize")]
    pub value: f64,
    pub entry_date: NaiveDate,
    #[serde(default, deserialize_with = "timestamp_ser::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp_ser::deserialize"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub local: bool,
}

impl Record for Entry {
    fn id(&self) -> &str {
        &self.id
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    #[serde(with = "id_ser")]
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "timestamp_ser::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub local: bool,
}

impl Record for Section {
    fn id(&self) -> &str {
        &self.id
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

pub fn find_habit<'a>(habits: &'a [Habit], id: &str) -> Option<&'a Habit> {
    habits.iter().find(|h| h.id == id)
}

/// Server ids are not guaranteed to be strings, numeric primary keys are accepted too.
pub(crate) mod id_ser {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(id)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(de::Error::custom(format!("expected string or number id, got {other}"))),
        }
    }

    pub fn from_value(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Numeric columns may come back as strings from some backends.
mod number_ser {
    use serde::{de, Deserialize, Deserializer};
    use serde_json::Value;

    fn from_value<E: de::Error>(value: Value) -> Result<Option<f64>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| E::custom(format!("{n} is not a finite number"))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|e| E::custom(format!("{s:?} is not a number: {e}"))),
            other => Err(E::custom(format!("expected number, got {other}"))),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        from_value::<D::Error>(Value::deserialize(deserializer)?)?
            .ok_or_else(|| de::Error::custom("missing numeric value"))
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        from_value::<D::Error>(Value::deserialize(deserializer)?)
    }
}

/// Accepts RFC 3339 as well as naive timestamps (treated as UTC). Anything unreadable is dropped
/// instead of rejecting the whole record.
mod timestamp_ser {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tracing::debug;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Value::String(raw) = Value::deserialize(deserializer)? else {
            return Ok(None);
        };
        Ok(super::parse_timestamp(&raw).or_else(|| {
            debug!("Ignoring unreadable timestamp {raw:?}");
            None
        }))
    }

    pub(super) fn parse_naive(raw: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|v| v.and_utc())
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|v| v.with_timezone(&Utc))
        .ok()
        .or_else(|| timestamp_ser::parse_naive(raw))
}
