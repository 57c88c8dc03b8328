use ammonia::clean;
use diesel::{
    backend::Backend,
    deserialize::{self, FromSql},
    serialize::{self, Output, ToSql},
    sql_types::Text,
};
use serde::{
    self, de::Visitor, Deserialize, Deserializer, Serialize, Serializer,
};
use std::{
    borrow::Borrow,
    fmt::{self, Display},
    io::Write,
    ops::Deref,
};

/// A string that is considered safe to display as HTML: every value
/// passes through ammonia when it is built, even when it comes back
/// from the database.
#[derive(Debug, Clone, PartialEq, Eq, AsExpression, FromSqlRow, Default)]
#[sql_type = "Text"]
pub struct SafeString {
    value: String,
}

impl SafeString {
    pub fn new(value: &str) -> Self {
        SafeString {
            value: clean(value),
        }
    }

    pub fn set(&mut self, value: &str) {
        self.value = clean(value);
    }

    pub fn get(&self) -> &String {
        &self.value
    }
}

impl Serialize for SafeString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

struct SafeStringVisitor;

impl<'de> Visitor<'de> for SafeStringVisitor {
    type Value = SafeString;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E>(self, value: &str) -> Result<SafeString, E>
    where
        E: serde::de::Error,
    {
        Ok(SafeString::new(value))
    }
}

impl<'de> Deserialize<'de> for SafeString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_string(SafeStringVisitor)
    }
}

impl<DB> FromSql<Text, DB> for SafeString
where
    DB: Backend,
    String: FromSql<Text, DB>,
{
    fn from_sql(value: Option<&DB::RawValue>) -> deserialize::Result<Self> {
        let string = String::from_sql(value)?;
        Ok(SafeString::new(&string))
    }
}

impl<DB> ToSql<Text, DB> for SafeString
where
    DB: Backend,
    str: ToSql<Text, DB>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, DB>) -> serialize::Result {
        str::to_sql(&self.value, out)
    }
}

impl Borrow<str> for SafeString {
    fn borrow(&self) -> &str {
        &self.value
    }
}

impl Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl Deref for SafeString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.value
    }
}
