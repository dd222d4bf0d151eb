use chrono::Utc;
use rusqlite::params;
use sha2::{Digest, Sha256};

use crate::db::Network;
use crate::error::{MuportError, Result};
use crate::export::UserRow;

/// Destination datetime format for `user_registered`.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Longest login the account table accepts.
const MAX_LOGIN_LEN: usize = 60;

/// Profile columns the creation path persists as user meta when the export
/// carries them. Extra columns outside this set are a custom-data hook
/// concern.
pub const PROFILE_META_COLUMNS: &[&str] = &[
    "first_name",
    "last_name",
    "nickname",
    "description",
    "rich_editing",
    "syntax_highlighting",
    "comment_shortcuts",
    "admin_color",
    "use_ssl",
    "show_admin_bar_front",
    "locale",
];

impl Network {
    pub fn find_user_by_login(&self, login: &str) -> Result<Option<u64>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT ID FROM {}users WHERE user_login = ?1",
            self.base_prefix()
        ))?;
        match stmt.query_row(params![login], |row| row.get::<_, u64>(0)) {
            Ok(id) => Ok(Some(id)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn email_in_use(&self, email: &str) -> Result<bool> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT EXISTS(SELECT 1 FROM {}users WHERE user_email = ?1)",
            self.base_prefix()
        ))?;
        let exists: bool = stmt.query_row(params![email], |row| row.get(0))?;
        Ok(exists)
    }

    /// Create an account from an export row, assigning a fresh ID.
    /// [`PROFILE_META_COLUMNS`] present in the row are persisted as user
    /// meta alongside.
    ///
    /// The stored password is re-hashed here like any other account
    /// creation; callers that need the exported hash verbatim follow up
    /// with [`Network::overwrite_user_pass`]. Validation failures collect
    /// into one [`MuportError::UserInsert`] so a batch caller can warn and
    /// move on.
    pub fn insert_user(&self, row: &UserRow) -> Result<u64> {
        let login = row.login();
        let email = row.get("user_email").unwrap_or_default();

        let mut messages = Vec::new();
        if login.is_empty() {
            messages.push("cannot create a user with an empty login name".to_string());
        } else if login.chars().count() > MAX_LOGIN_LEN {
            messages.push(format!(
                "username may not be longer than {MAX_LOGIN_LEN} characters"
            ));
        } else if self.find_user_by_login(login)?.is_some() {
            messages.push(format!("username '{login}' already exists"));
        }
        if !email.is_empty() && self.email_in_use(email)? {
            messages.push(format!("email address '{email}' is already used"));
        }
        if !messages.is_empty() {
            return Err(MuportError::UserInsert {
                login: login.to_string(),
                messages,
            });
        }

        let pass = hash_password(row.get("user_pass").unwrap_or_default())?;
        let registered = match row.get("user_registered") {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => Utc::now().format(DATETIME_FORMAT).to_string(),
        };
        let status: i64 = row
            .get("user_status")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        self.conn().execute(
            &format!(
                "INSERT INTO {}users
                 (user_login, user_pass, user_nicename, user_email, user_url,
                  user_registered, user_activation_key, user_status, display_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                self.base_prefix()
            ),
            params![
                login,
                pass,
                non_empty_or(row.get("user_nicename"), login),
                email,
                row.get("user_url").unwrap_or_default(),
                registered,
                row.get("user_activation_key").unwrap_or_default(),
                status,
                non_empty_or(row.get("display_name"), login),
            ],
        )?;
        let new_id = self.conn().last_insert_rowid() as u64;

        for column in PROFILE_META_COLUMNS {
            if let Some(value) = row.get(column)
                && !value.is_empty()
            {
                self.update_user_meta(new_id, column, &sanitize_text(value))?;
            }
        }
        Ok(new_id)
    }

    /// Replace the stored hash with the exported one, bypassing the
    /// creation-path re-hash.
    pub fn overwrite_user_pass(&self, user_id: u64, hash: &str) -> Result<()> {
        self.conn().execute(
            &format!(
                "UPDATE {}users SET user_pass = ?1 WHERE ID = ?2",
                self.base_prefix()
            ),
            params![hash, user_id],
        )?;
        Ok(())
    }

    pub fn user_pass(&self, user_id: u64) -> Result<Option<String>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT user_pass FROM {}users WHERE ID = ?1",
            self.base_prefix()
        ))?;
        match stmt.query_row(params![user_id], |row| row.get(0)) {
            Ok(pass) => Ok(Some(pass)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Update-else-insert, one value per (user, key).
    pub fn update_user_meta(&self, user_id: u64, key: &str, value: &str) -> Result<()> {
        let updated = self.conn().execute(
            &format!(
                "UPDATE {}usermeta SET meta_value = ?3 WHERE user_id = ?1 AND meta_key = ?2",
                self.base_prefix()
            ),
            params![user_id, key, value],
        )?;
        if updated == 0 {
            self.conn().execute(
                &format!(
                    "INSERT INTO {}usermeta (user_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
                    self.base_prefix()
                ),
                params![user_id, key, value],
            )?;
        }
        Ok(())
    }

    pub fn get_user_meta(&self, user_id: u64, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT meta_value FROM {}usermeta WHERE user_id = ?1 AND meta_key = ?2",
            self.base_prefix()
        ))?;
        match stmt.query_row(params![user_id, key], |row| row.get(0)) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Grant the account a role on one blog. Membership lives in user meta
    /// keyed by the blog's table prefix.
    pub fn add_user_to_blog(&self, blog_id: u64, user_id: u64, role: &str) -> Result<()> {
        self.require_blog(blog_id)?;
        let key = format!("{}capabilities", self.blog_prefix(blog_id));
        let value = serde_json::json!({ role: true }).to_string();
        self.update_user_meta(user_id, &key, &value)
    }
}

fn non_empty_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

/// Creation-path hash: salted SHA-256 rendered as `$sp1$<salt>$<digest>`.
fn hash_password(password: &str) -> Result<String> {
    hash_password_with(password, |bytes| {
        getrandom::fill(bytes)
            .map_err(|e| MuportError::Io(std::io::Error::other(e.to_string())))
    })
}

fn hash_password_with<F>(password: &str, mut fill_random: F) -> Result<String>
where
    F: FnMut(&mut [u8]) -> Result<()>,
{
    let mut salt = [0u8; 8];
    fill_random(&mut salt)?;
    let salt_hex = hex(&salt);

    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    Ok(format!("$sp1${salt_hex}${}", hex(&digest)))
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Meta values copied from an export are plain text: tags stripped, control
/// characters dropped, whitespace runs collapsed.
pub(crate) fn sanitize_text(value: &str) -> String {
    let mut stripped = String::with_capacity(value.len());
    let mut in_tag = false;
    for c in value.chars() {
        if in_tag {
            if c == '>' {
                in_tag = false;
            }
            continue;
        }
        if c == '<' {
            in_tag = true;
        } else if c.is_control() {
            stripped.push(' ');
        } else {
            stripped.push(c);
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
