use crate::{schema::medias, users::User, Connection, Error, Result, CONFIG};
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};
use guid_create::GUID;
use std::{fs, path::Path};
use tracing::warn;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024;

#[derive(Clone, Identifiable, Queryable, Serialize)]
pub struct Media {
    pub id: i32,
    pub file_path: String,
    pub alt_text: String,
    pub owner_id: i32,
}

#[derive(Insertable)]
#[table_name = "medias"]
pub struct NewMedia {
    pub file_path: String,
    pub alt_text: String,
    pub owner_id: i32,
}

impl Media {
    insert!(medias, NewMedia);
    get!(medias);
    list_by!(medias, for_owner, owner_id as i32);

    /// Checks an upload before anything is written: a size cap and an
    /// image extension allow-list.
    pub fn validate_upload(file_name: &str, size: u64) -> Result<()> {
        let extension = file_name
            .rsplit_once('.')
            .map(|x| x.1.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(Error::InvalidValue);
        }
        if size > MAX_FILE_SIZE {
            return Err(Error::InvalidValue);
        }
        Ok(())
    }

    /// Validates and stores an upload under the configured media
    /// directory, with a random name to avoid clashes.
    pub fn store(
        conn: &Connection,
        owner: &User,
        file_name: &str,
        bytes: &[u8],
        alt_text: &str,
    ) -> Result<Media> {
        Media::validate_upload(file_name, bytes.len() as u64)?;
        let extension = file_name
            .rsplit_once('.')
            .map(|x| x.1.to_lowercase())
            .unwrap_or_default();

        fs::DirBuilder::new()
            .recursive(true)
            .create(&CONFIG.media_directory)?;
        let path = Path::new(&CONFIG.media_directory)
            .join(format!("{}.{}", GUID::rand(), extension));
        fs::write(&path, bytes)?;

        Media::insert(
            conn,
            NewMedia {
                file_path: path.to_string_lossy().into_owned(),
                alt_text: alt_text.to_owned(),
                owner_id: owner.id,
            },
        )
    }

    pub fn url(&self) -> String {
        format!("{}/{}", CONFIG.base_url, self.file_path)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        if let Err(err) = fs::remove_file(&self.file_path) {
            warn!("couldn't delete media file {}: {}", self.file_path, err);
        }
        diesel::delete(self).execute(conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::db, users::tests::fill_database};
    use diesel::Connection;

    #[test]
    fn upload_validation() {
        assert!(Media::validate_upload("picture.png", 1024).is_ok());
        assert!(Media::validate_upload("picture.JPG", 1024).is_ok());
        assert!(Media::validate_upload("picture.jpeg", MAX_FILE_SIZE).is_ok());

        // wrong extension
        assert!(Media::validate_upload("archive.zip", 1024).is_err());
        assert!(Media::validate_upload("noextension", 1024).is_err());
        // too big
        assert!(Media::validate_upload("picture.png", MAX_FILE_SIZE + 1).is_err());
    }

    #[test]
    fn store_and_delete() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let users = fill_database(&conn);
            let media = Media::store(
                &conn,
                &users[0],
                "avatar.png",
                b"not a real png, but close enough",
                "The admin",
            )
            .unwrap();
            assert!(std::path::Path::new(&media.file_path).exists());
            assert_eq!(media.owner_id, users[0].id);

            media.delete(&conn).unwrap();
            assert!(!std::path::Path::new(&media.file_path).exists());
            assert!(Media::get(&conn, media.id).is_err());
            Ok(())
        });
    }
}
