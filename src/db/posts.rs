use rusqlite::{params, params_from_iter};

use crate::db::Network;
use crate::error::Result;

/// One enumerated content record of the current blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: u64,
    pub author: u64,
    pub title: String,
}

impl Network {
    /// Records carrying an author reference, in ID order. Zero-author rows
    /// (imported stubs, menu items) are not references and never enumerate.
    pub fn authored_posts(&self) -> Result<Vec<PostRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT ID, post_author, post_title FROM {}posts
             WHERE post_author != 0 ORDER BY ID",
            self.current_prefix()
        ))?;
        let posts = stmt
            .query_map([], |row| {
                Ok(PostRecord {
                    id: row.get(0)?,
                    author: row.get(1)?,
                    title: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    /// Records whose type and status both fall in the allow-lists, in ID
    /// order.
    pub fn posts_of_types(&self, types: &[&str], statuses: &[&str]) -> Result<Vec<PostRecord>> {
        if types.is_empty() || statuses.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT ID, post_author, post_title FROM {}posts
             WHERE post_type IN ({}) AND post_status IN ({}) ORDER BY ID",
            self.current_prefix(),
            placeholders(1, types.len()),
            placeholders(1 + types.len(), statuses.len()),
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let posts = stmt
            .query_map(params_from_iter(types.iter().chain(statuses.iter())), |row| {
                Ok(PostRecord {
                    id: row.get(0)?,
                    author: row.get(1)?,
                    title: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    pub fn update_post_author(&self, post_id: u64, author: u64) -> Result<()> {
        self.conn().execute(
            &format!(
                "UPDATE {}posts SET post_author = ?2 WHERE ID = ?1",
                self.current_prefix()
            ),
            params![post_id, author],
        )?;
        Ok(())
    }

    pub fn post_author(&self, post_id: u64) -> Result<Option<u64>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT post_author FROM {}posts WHERE ID = ?1",
            self.current_prefix()
        ))?;
        match stmt.query_row(params![post_id], |row| row.get(0)) {
            Ok(author) => Ok(Some(author)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn post_meta(&self, post_id: u64, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT meta_value FROM {}postmeta WHERE post_id = ?1 AND meta_key = ?2",
            self.current_prefix()
        ))?;
        match stmt.query_row(params![post_id, key], |row| row.get(0)) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Update-else-insert, one value per (post, key).
    pub fn set_post_meta(&self, post_id: u64, key: &str, value: &str) -> Result<()> {
        let updated = self.conn().execute(
            &format!(
                "UPDATE {}postmeta SET meta_value = ?3 WHERE post_id = ?1 AND meta_key = ?2",
                self.current_prefix()
            ),
            params![post_id, key, value],
        )?;
        if updated == 0 {
            self.conn().execute(
                &format!(
                    "INSERT INTO {}postmeta (post_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
                    self.current_prefix()
                ),
                params![post_id, key, value],
            )?;
        }
        Ok(())
    }

    /// Seed one record into the current blog. Fixture helper.
    pub fn insert_post(
        &self,
        author: u64,
        title: &str,
        post_type: &str,
        post_status: &str,
    ) -> Result<u64> {
        self.conn().execute(
            &format!(
                "INSERT INTO {}posts (post_author, post_title, post_type, post_status)
                 VALUES (?1, ?2, ?3, ?4)",
                self.current_prefix()
            ),
            params![author, title, post_type, post_status],
        )?;
        Ok(self.conn().last_insert_rowid() as u64)
    }
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}
