use crate::users::User;

/// Mutating operations gated behind a role check.
#[derive(Clone, Copy)]
pub enum Action<'a> {
    ManagePosts,
    ManageTags,
    ModerateComments,
    ManageSubscribers,
    SendNewsletter,
    ViewDashboard,
    ManageUsers,
    DeleteUser(&'a User),
}

/// Why an action was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    StaffRequired,
    AdminRequired,
    OwnAccount,
    AdminAccount,
}

pub fn can_perform(actor: &User, action: Action<'_>) -> Result<(), Denial> {
    match action {
        Action::ManagePosts
        | Action::ManageTags
        | Action::ModerateComments
        | Action::ManageSubscribers
        | Action::SendNewsletter
        | Action::ViewDashboard => {
            if actor.is_moderator() {
                Ok(())
            } else {
                Err(Denial::StaffRequired)
            }
        }
        Action::ManageUsers => {
            if actor.is_admin() {
                Ok(())
            } else {
                Err(Denial::AdminRequired)
            }
        }
        Action::DeleteUser(target) => {
            if target.id == actor.id {
                Err(Denial::OwnAccount)
            } else if !actor.is_admin() {
                Err(Denial::AdminRequired)
            } else if target.is_admin() {
                Err(Denial::AdminAccount)
            } else {
                Ok(())
            }
        }
    }
}

/// Wrapper around User for code paths reserved to admins.
pub struct Admin(pub User);

impl Admin {
    pub fn check(user: User) -> Result<Admin, Denial> {
        if user.is_admin() {
            Ok(Admin(user))
        } else {
            Err(Denial::AdminRequired)
        }
    }
}

/// Same as `Admin` but for moderators.
pub struct Moderator(pub User);

impl Moderator {
    pub fn check(user: User) -> Result<Moderator, Denial> {
        if user.is_moderator() {
            Ok(Moderator(user))
        } else {
            Err(Denial::StaffRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::db, users::tests::fill_database};
    use diesel::Connection;

    #[test]
    fn role_gating() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let users = fill_database(&conn);
            let (admin, moderator, user) = (&users[0], &users[1], &users[2]);

            assert!(can_perform(admin, Action::ManageUsers).is_ok());
            assert_eq!(
                can_perform(moderator, Action::ManageUsers),
                Err(Denial::AdminRequired)
            );
            assert!(can_perform(moderator, Action::ModerateComments).is_ok());
            assert_eq!(
                can_perform(user, Action::ModerateComments),
                Err(Denial::StaffRequired)
            );

            assert_eq!(
                can_perform(admin, Action::DeleteUser(admin)),
                Err(Denial::OwnAccount)
            );

            assert!(Admin::check(admin.clone()).is_ok());
            assert!(Admin::check(moderator.clone()).is_err());
            assert!(Moderator::check(moderator.clone()).is_ok());
            assert!(Moderator::check(user.clone()).is_err());
            Ok(())
        });
    }

    #[test]
    fn delete_user_rules() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let users = fill_database(&conn);
            let (admin, moderator, user) = (&users[0], &users[1], &users[2]);
            assert!(can_perform(admin, Action::DeleteUser(user)).is_ok());
            assert_eq!(
                can_perform(user, Action::DeleteUser(user)),
                Err(Denial::OwnAccount)
            );
            assert_eq!(
                can_perform(moderator, Action::DeleteUser(user)),
                Err(Denial::AdminRequired)
            );
            assert_eq!(
                can_perform(moderator, Action::DeleteUser(admin)),
                Err(Denial::AdminRequired)
            );
            Ok(())
        });
    }
}
