use std::path::Path;

use crate::config::Config;
use crate::db::Network;
use crate::db::users::sanitize_text;
use crate::error::{MuportError, Result};
use crate::export::ExportReader;
use crate::hooks::Hooks;
use crate::ids_map::IdsMap;
use crate::launcher::{Launcher, WpCli};
use crate::output;

const UPLOADS_PATH: &str = "wp-content/uploads";

/// Outcome counts for one `import users` run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub created: u64,
    pub reused: u64,
    pub failed: u64,
}

/// `import users <file> --blog-id <id>`
pub fn users(
    config: &Config,
    file: &Path,
    blog_id: u64,
    map_file: &Path,
    delimiter: char,
) -> Result<()> {
    let network = Network::open(&config.db, &config.prefix)?;
    import_users(&network, &Hooks::new(), file, blog_id, map_file, delimiter)?;
    Ok(())
}

/// Bring every account of an export into the network, attach it to the
/// target blog, and leave behind the old-to-new ID map the rewrite
/// passes replay later.
pub fn import_users(
    network: &Network,
    hooks: &Hooks,
    file: &Path,
    blog_id: u64,
    map_file: &Path,
    delimiter: char,
) -> Result<ImportReport> {
    let delimiter = delimiter_byte(delimiter)?;
    if file.as_os_str().is_empty() || !file.is_file() {
        return Err(MuportError::InvalidInputFile(file.to_path_buf()));
    }
    network.require_blog(blog_id)?;

    output::line(&format!("Parsing {}...", file.display()));
    let mut reader = ExportReader::open(file, delimiter)?;

    let mut map = IdsMap::new();
    let mut report = ImportReport::default();

    for row in reader.rows() {
        let mut row = row?;
        let old_id = row.take_old_id()?;

        if let Some(existing) = network.find_user_by_login(row.login())? {
            output::warning(&format!("{} exists, using their ID...", row.login()));
            report.reused += 1;
            map.set(old_id, existing)?;
            network.add_user_to_blog(blog_id, existing, row.role())?;
            continue;
        }

        let new_id = match network.insert_user(&row) {
            Ok(id) => id,
            Err(MuportError::UserInsert { login, messages }) => {
                output::warning(&format!(
                    "An error has occurred when inserting {login}: {}.",
                    messages.join(", ")
                ));
                report.failed += 1;
                continue;
            }
            Err(other) => return Err(other),
        };

        // The creation path hashes whatever it is handed; the export
        // carries an already-hashed value that must survive verbatim.
        if let Some(pass) = row.get("user_pass") {
            network.overwrite_user_pass(new_id, pass)?;
        }

        hooks.run_before(&row, new_id);
        for (key, value) in hooks.collect_custom_data(&row, new_id) {
            // Hooks can only fill columns the export actually carries.
            if row.get(&key).is_some() {
                network.update_user_meta(new_id, &key, &sanitize_text(&value))?;
            }
        }
        hooks.run_after(&row, new_id);

        report.created += 1;
        map.set(old_id, new_id)?;
        network.add_user_to_blog(blog_id, new_id, row.role())?;
    }

    if !map.is_empty() {
        map.save_to_file(map_file)?;
        output::success(&format!(
            "A map file has been created: {}",
            map_file.display()
        ));
    }

    output::success(&format!(
        "{} users have been imported and {} users already existed",
        report.created, report.reused
    ));

    Ok(report)
}

/// `import tables <file> --blog-id <id>`
pub fn tables(
    config: &Config,
    file: &Path,
    blog_id: u64,
    old_prefix: Option<&str>,
    old_url: Option<&str>,
    new_url: Option<&str>,
) -> Result<()> {
    let mut network = Network::open(&config.db, &config.prefix)?;
    let mut launcher = WpCli::new(config.wp_bin.as_str());
    let old_prefix = old_prefix.unwrap_or(&config.prefix);
    import_tables(
        &mut network,
        &mut launcher,
        file,
        blog_id,
        old_prefix,
        old_url,
        new_url,
    )
}

/// Load a SQL dump into the blog's namespace, rewrite URLs and uploads
/// paths through the external tool, then rename the roles option key to
/// the blog's own prefix.
pub fn import_tables(
    network: &mut Network,
    launcher: &mut dyn Launcher,
    file: &Path,
    blog_id: u64,
    old_prefix: &str,
    old_url: Option<&str>,
    new_url: Option<&str>,
) -> Result<()> {
    if file.as_os_str().is_empty() || !file.is_file() {
        return Err(MuportError::InvalidInputFile(file.to_path_buf()));
    }
    network.require_blog(blog_id)?;

    let status = launcher.db_import(file)?;
    if status != 0 {
        return Err(MuportError::BulkLoadFailed(status));
    }
    output::line("Database imported");

    if let (Some(old_url), Some(new_url)) = (old_url, new_url)
        && !old_url.is_empty()
        && !new_url.is_empty()
    {
        output::line("Running search-replace");

        // Which of the two URLs is live in the loaded data is unknown,
        // so try the destination scope first, then the source.
        let mut rewritten = None;
        for scope in [new_url, old_url] {
            if launcher.search_replace(old_url, new_url, scope)? == 0 {
                rewritten = Some(scope);
                break;
            }
        }
        match rewritten {
            Some(scope) => output::line(&format!(
                "Search and Replace has been successfully executed (scoped to {scope})"
            )),
            None => output::warning("Search and Replace failed for both URL scopes"),
        }

        let uploads = format!("{UPLOADS_PATH}/sites/{blog_id}");
        if launcher.search_replace(UPLOADS_PATH, &uploads, new_url)? == 0 {
            output::line("Uploads paths have been successfully executed");
        } else {
            output::warning("Uploads paths rewrite failed");
        }
    }

    let guard = network.switch_to_blog(blog_id)?;
    let old_key = format!("{old_prefix}user_roles");
    let new_key = format!("{}user_roles", guard.current_prefix());
    guard.rename_option(&old_key, &new_key)?;

    Ok(())
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter).map_err(|_| MuportError::InvalidDelimiter(delimiter))
}
