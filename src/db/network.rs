use std::ops::{Deref, DerefMut};
use std::path::Path;

use rusqlite::{Connection, params};

use crate::error::{MuportError, Result};

/// Handle on a multisite destination database.
///
/// Account tables (`{base}users`, `{base}usermeta`) and the blog registry are
/// network-global and always addressed through the base prefix. Content
/// tables (`posts`, `postmeta`, `options`) belong to one blog each and follow
/// the current context, which starts at the main blog and moves with
/// [`Network::switch_to_blog`].
pub struct Network {
    conn: Connection,
    base_prefix: String,
    current_blog: u64,
}

/// The main blog shares the network base prefix instead of a numbered one.
pub const MAIN_BLOG_ID: u64 = 1;

impl Network {
    pub fn open(path: &Path, base_prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            base_prefix: base_prefix.into(),
            current_blog: MAIN_BLOG_ID,
        })
    }

    pub fn open_memory(base_prefix: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            base_prefix: base_prefix.into(),
            current_blog: MAIN_BLOG_ID,
        })
    }

    /// Create the network schema plus per-blog tables for each listed blog,
    /// and register the blogs. Destination fixtures for tests and dev
    /// databases; production databases arrive with their schema in place.
    pub fn install(&self, blog_ids: &[u64]) -> Result<()> {
        let base = &self.base_prefix;
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {base}users (
                ID INTEGER PRIMARY KEY AUTOINCREMENT,
                user_login TEXT NOT NULL DEFAULT '',
                user_pass TEXT NOT NULL DEFAULT '',
                user_nicename TEXT NOT NULL DEFAULT '',
                user_email TEXT NOT NULL DEFAULT '',
                user_url TEXT NOT NULL DEFAULT '',
                user_registered TEXT NOT NULL DEFAULT '',
                user_activation_key TEXT NOT NULL DEFAULT '',
                user_status INTEGER NOT NULL DEFAULT 0,
                display_name TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS {base}usermeta (
                umeta_id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL DEFAULT 0,
                meta_key TEXT,
                meta_value TEXT
            );
            CREATE TABLE IF NOT EXISTS {base}blogs (
                blog_id INTEGER PRIMARY KEY,
                domain TEXT NOT NULL DEFAULT '',
                path TEXT NOT NULL DEFAULT '/'
            );"
        ))?;

        for &blog_id in blog_ids {
            let prefix = self.blog_prefix(blog_id);
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {prefix}posts (
                    ID INTEGER PRIMARY KEY AUTOINCREMENT,
                    post_author INTEGER NOT NULL DEFAULT 0,
                    post_title TEXT NOT NULL DEFAULT '',
                    post_type TEXT NOT NULL DEFAULT 'post',
                    post_status TEXT NOT NULL DEFAULT 'publish'
                );
                CREATE TABLE IF NOT EXISTS {prefix}postmeta (
                    meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    post_id INTEGER NOT NULL DEFAULT 0,
                    meta_key TEXT,
                    meta_value TEXT
                );
                CREATE TABLE IF NOT EXISTS {prefix}options (
                    option_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    option_name TEXT NOT NULL UNIQUE,
                    option_value TEXT NOT NULL DEFAULT ''
                );"
            ))?;
            self.conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO {base}blogs (blog_id, domain, path) VALUES (?1, 'localhost', '/')"
                ),
                params![blog_id],
            )?;
        }
        Ok(())
    }

    /// A destination without a blog registry is a single site, which this
    /// tool never writes to.
    pub fn is_multisite(&self) -> Result<bool> {
        self.table_exists(&format!("{}blogs", self.base_prefix))
    }

    pub fn blog_exists(&self, blog_id: u64) -> Result<bool> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT EXISTS(SELECT 1 FROM {}blogs WHERE blog_id = ?1)",
            self.base_prefix
        ))?;
        let exists: bool = stmt.query_row(params![blog_id], |row| row.get(0))?;
        Ok(exists)
    }

    pub fn require_blog(&self, blog_id: u64) -> Result<()> {
        if !self.is_multisite()? {
            return Err(MuportError::NotMultisite);
        }
        if !self.blog_exists(blog_id)? {
            return Err(MuportError::UnknownBlog(blog_id));
        }
        Ok(())
    }

    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    pub fn blog_prefix(&self, blog_id: u64) -> String {
        if blog_id == MAIN_BLOG_ID {
            self.base_prefix.clone()
        } else {
            format!("{}{blog_id}_", self.base_prefix)
        }
    }

    pub fn current_blog(&self) -> u64 {
        self.current_blog
    }

    /// Prefix of the blog the per-blog tables currently resolve to.
    pub(crate) fn current_prefix(&self) -> String {
        self.blog_prefix(self.current_blog)
    }

    /// Point per-blog tables at `blog_id` until the guard drops, then
    /// restore the prior context. Restoration runs on every exit path,
    /// early `?` returns included.
    pub fn switch_to_blog(&mut self, blog_id: u64) -> Result<BlogGuard<'_>> {
        self.require_blog(blog_id)?;
        let prior = self.current_blog;
        self.current_blog = blog_id;
        Ok(BlogGuard {
            network: self,
            prior,
        })
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        )?;
        let exists: bool = stmt.query_row(params![name], |row| row.get(0))?;
        Ok(exists)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

pub struct BlogGuard<'n> {
    network: &'n mut Network,
    prior: u64,
}

impl Deref for BlogGuard<'_> {
    type Target = Network;

    fn deref(&self) -> &Network {
        self.network
    }
}

impl DerefMut for BlogGuard<'_> {
    fn deref_mut(&mut self) -> &mut Network {
        self.network
    }
}

impl Drop for BlogGuard<'_> {
    fn drop(&mut self) {
        self.network.current_blog = self.prior;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Network {
        let net = Network::open_memory("wp_").unwrap();
        net.install(&[1, 2, 3]).unwrap();
        net
    }

    #[test]
    fn empty_database_is_not_multisite() {
        let net = Network::open_memory("wp_").unwrap();
        assert!(!net.is_multisite().unwrap());
        assert!(matches!(
            net.require_blog(1).unwrap_err(),
            MuportError::NotMultisite
        ));
    }

    #[test]
    fn installed_network_is_multisite() {
        let net = network();
        assert!(net.is_multisite().unwrap());
        assert!(net.blog_exists(2).unwrap());
        assert!(!net.blog_exists(9).unwrap());
    }

    #[test]
    fn unknown_blog_is_rejected() {
        let net = network();
        assert!(matches!(
            net.require_blog(9).unwrap_err(),
            MuportError::UnknownBlog(9)
        ));
    }

    #[test]
    fn main_blog_shares_the_base_prefix() {
        let net = network();
        assert_eq!(net.blog_prefix(1), "wp_");
        assert_eq!(net.blog_prefix(3), "wp_3_");
    }

    #[test]
    fn custom_base_prefix_flows_through() {
        let net = Network::open_memory("site_").unwrap();
        net.install(&[1, 2]).unwrap();
        assert_eq!(net.blog_prefix(2), "site_2_");
        assert!(net.is_multisite().unwrap());
    }

    #[test]
    fn switch_restores_on_drop() {
        let mut net = network();
        assert_eq!(net.current_blog(), 1);
        {
            let guard = net.switch_to_blog(3).unwrap();
            assert_eq!(guard.current_blog(), 3);
            assert_eq!(guard.current_prefix(), "wp_3_");
        }
        assert_eq!(net.current_blog(), 1);
    }

    #[test]
    fn switch_restores_on_early_error_return() {
        fn failing_pass(net: &mut Network) -> Result<()> {
            let guard = net.switch_to_blog(2)?;
            guard.require_blog(9)?;
            Ok(())
        }

        let mut net = network();
        assert!(failing_pass(&mut net).is_err());
        assert_eq!(net.current_blog(), 1);
    }

    #[test]
    fn switch_to_unknown_blog_fails_without_moving() {
        let mut net = network();
        assert!(net.switch_to_blog(9).is_err());
        assert_eq!(net.current_blog(), 1);
    }
}
