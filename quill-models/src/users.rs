use crate::{
    admin::{can_perform, Action},
    schema::users,
    Connection, Error, Result,
};
use chrono::NaiveDateTime;
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin = 0,
    Moderator = 1,
    Normal = 2,
}

/// The values of the symbol class for strong passwords.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";
const PASSWORD_MIN_LENGTH: usize = 8;

/// Each rule a password can break is reported on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordError {
    TooShort,
    NoUppercase,
    NoLowercase,
    NoDigit,
    NoSymbol,
}

pub fn validate_password(password: &str) -> std::result::Result<(), PasswordError> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordError::NoUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordError::NoLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::NoDigit);
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(PasswordError::NoSymbol);
    }
    Ok(())
}

#[derive(Queryable, Identifiable, Clone, Debug, AsChangeset, Serialize)]
#[changeset_options(treat_none_as_null = "true")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    pub bio: String,
    pub avatar_id: Option<i32>,
    /// 0 = admin
    /// 1 = moderator
    /// anything else = normal user
    pub role: i32,
    pub creation_date: NaiveDateTime,
}

#[derive(Default, Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: Option<String>,
    pub bio: String,
    pub avatar_id: Option<i32>,
    pub role: i32,
}

impl User {
    insert!(users, NewUser);
    get!(users);
    find_by!(users, find_by_email, email as &str);
    find_by!(users, find_by_username, username as &str);

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin as i32
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Admin as i32 || self.role == Role::Moderator as i32
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        users::table.count().get_result(conn).map_err(Error::from)
    }

    pub fn page(conn: &Connection, (min, max): (i32, i32)) -> Result<Vec<User>> {
        users::table
            .order(users::creation_date.desc())
            .offset(min.into())
            .limit((max - min).into())
            .load::<User>(conn)
            .map_err(Error::from)
    }

    pub fn hash_pass(pass: &str) -> Result<String> {
        bcrypt::hash(pass, 10).map_err(|_| Error::InvalidValue)
    }

    pub fn login(conn: &Connection, ident: &str, password: &str) -> Result<User> {
        let user = User::find_by_email(conn, ident)
            .or_else(|_| User::find_by_username(conn, ident))?;

        match user.hashed_password.as_ref() {
            Some(hash) if bcrypt::verify(password, hash).unwrap_or(false) => Ok(user),
            _ => Err(Error::NotFound),
        }
    }

    pub fn reset_password(&self, conn: &Connection, pass: &str) -> Result<()> {
        validate_password(pass).map_err(Error::WeakPassword)?;
        diesel::update(self)
            .set(users::hashed_password.eq(User::hash_pass(pass)?))
            .execute(conn)?;
        Ok(())
    }

    pub fn set_role(&self, conn: &Connection, new_role: Role) -> Result<()> {
        diesel::update(self)
            .set(users::role.eq(new_role as i32))
            .execute(conn)?;
        Ok(())
    }

    pub fn set_avatar(&self, conn: &Connection, avatar_id: i32) -> Result<()> {
        diesel::update(self)
            .set(users::avatar_id.eq(avatar_id))
            .execute(conn)?;
        Ok(())
    }

    /// Deletes this account on behalf of `actor`. An account cannot
    /// delete itself, and admin accounts cannot be deleted at all.
    pub fn delete(&self, conn: &Connection, actor: &User) -> Result<()> {
        can_perform(actor, Action::DeleteUser(self)).map_err(Error::Forbidden)?;
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}

impl NewUser {
    /// Creates a new account with a validated password.
    pub fn new_local(
        conn: &Connection,
        username: String,
        email: String,
        role: Role,
        bio: &str,
        password: &str,
    ) -> Result<User> {
        if username.is_empty() || !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(Error::InvalidValue);
        }
        validate_password(password).map_err(Error::WeakPassword)?;

        match User::insert(
            conn,
            NewUser {
                username,
                email,
                hashed_password: Some(User::hash_pass(password)?),
                bio: bio.to_owned(),
                avatar_id: None,
                role: role as i32,
            },
        ) {
            Err(Error::Db(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))) => Err(Error::UserAlreadyExists),
            other => other,
        }
    }
}
