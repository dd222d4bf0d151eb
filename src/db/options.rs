use rusqlite::params;

use crate::db::Network;
use crate::error::Result;

impl Network {
    pub fn get_option(&self, name: &str) -> Result<Option<String>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT option_value FROM {}options WHERE option_name = ?1",
            self.current_prefix()
        ))?;
        match stmt.query_row(params![name], |row| row.get(0)) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_option(&self, name: &str, value: &str) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT OR REPLACE INTO {}options (option_name, option_value) VALUES (?1, ?2)",
                self.current_prefix()
            ),
            params![name, value],
        )?;
        Ok(())
    }

    /// Move an option to a new key in place. Returns whether a row moved;
    /// a missing source key is not an error.
    pub fn rename_option(&self, old: &str, new: &str) -> Result<bool> {
        let moved = self.conn().execute(
            &format!(
                "UPDATE {}options SET option_name = ?2 WHERE option_name = ?1",
                self.current_prefix()
            ),
            params![old, new],
        )?;
        Ok(moved > 0)
    }
}
