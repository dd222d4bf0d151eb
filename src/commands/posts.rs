use std::path::Path;

use crate::config::Config;
use crate::db::Network;
use crate::error::Result;
use crate::ids_map::IdsMap;
use crate::output;

/// Record types the commerce plugin registers for orders.
pub const WC_ORDER_TYPES: &[&str] = &["shop_order", "shop_order_refund"];

/// Order statuses eligible for the customer rewrite.
pub const WC_ORDER_STATUSES: &[&str] = &[
    "wc-pending",
    "wc-processing",
    "wc-on-hold",
    "wc-completed",
    "wc-cancelled",
    "wc-refunded",
    "wc-failed",
];

/// Meta key holding an order's owning customer.
pub const CUSTOMER_USER_META: &str = "_customer_user";

/// Per-record outcome counts for one rewrite pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteTally {
    pub updated: u64,
    /// Records whose mapped ID equals the current value.
    pub unchanged: Vec<u64>,
    /// Records whose current value has no map entry.
    pub unresolved: Vec<u64>,
}

enum Outcome {
    Updated(u64),
    Unchanged,
    Unresolved,
}

/// One rule for both passes: rewrite only when the map has the current
/// value as a key and the mapped ID differs from it.
fn classify(map: &IdsMap, current: u64) -> Outcome {
    match map.get(current) {
        Some(new) if new != current => Outcome::Updated(new),
        Some(_) => Outcome::Unchanged,
        None => Outcome::Unresolved,
    }
}

fn rewrite_references<I, F>(
    map: &IdsMap,
    records: I,
    reference: &str,
    mut apply: F,
) -> Result<RewriteTally>
where
    I: IntoIterator<Item = (u64, String, u64)>,
    F: FnMut(u64, u64) -> Result<()>,
{
    let mut tally = RewriteTally::default();
    for (id, title, current) in records {
        match classify(map, current) {
            Outcome::Updated(new) => {
                apply(id, new)?;
                output::line(&format!("Updated {reference} for \"{title}\" (ID #{id})"));
                tally.updated += 1;
            }
            Outcome::Unchanged => {
                output::line(&format!("#{id} New user ID equals to the old user ID"));
                tally.unchanged.push(id);
            }
            Outcome::Unresolved => {
                output::line(&format!(
                    "#{id} New user ID not found or it's already been updated"
                ));
                tally.unresolved.push(id);
            }
        }
    }
    Ok(tally)
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn report(tally: &RewriteTally, reference: &str) {
    if !tally.unresolved.is_empty() {
        output::warning(&format!(
            "{} records failed to update {reference}: {}",
            tally.unresolved.len(),
            join_ids(&tally.unresolved)
        ));
    }
    if !tally.unchanged.is_empty() {
        output::warning(&format!(
            "The following records have the new ID equal to the old ID: {}",
            join_ids(&tally.unchanged)
        ));
    }
    output::success(&format!("{} records have been updated", tally.updated));
}

/// Replay the ID map over `post_author` for every authored post of a blog.
pub fn rewrite_authors(network: &mut Network, map: &IdsMap, blog_id: u64) -> Result<RewriteTally> {
    let guard = network.switch_to_blog(blog_id)?;
    let posts = guard.authored_posts()?;
    let records = posts.into_iter().map(|p| (p.id, p.title, p.author));
    rewrite_references(map, records, "post_author", |id, new| {
        guard.update_post_author(id, new)
    })
}

/// Replay the ID map over the `_customer_user` meta of order records.
///
/// Orders without the meta entry, or with an empty one, are skipped
/// outright. A non-numeric owner can never match a map key, so it lands
/// in the unresolved bucket.
pub fn rewrite_wc_customers(
    network: &mut Network,
    map: &IdsMap,
    blog_id: u64,
    types: &[&str],
    statuses: &[&str],
) -> Result<RewriteTally> {
    let guard = network.switch_to_blog(blog_id)?;
    let mut records = Vec::new();
    for post in guard.posts_of_types(types, statuses)? {
        let Some(raw) = guard.post_meta(post.id, CUSTOMER_USER_META)? else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let current = raw.parse::<u64>().unwrap_or(0);
        records.push((post.id, post.title, current));
    }
    rewrite_references(map, records, "customer_user", |id, new| {
        guard.set_post_meta(id, CUSTOMER_USER_META, &new.to_string())
    })
}

/// `posts update-author <map> --blog-id <id>`
pub fn update_author(config: &Config, map_file: &Path, blog_id: u64) -> Result<()> {
    let map = IdsMap::load_from_file(map_file)?;
    let mut network = Network::open(&config.db, &config.prefix)?;
    let tally = rewrite_authors(&mut network, &map, blog_id)?;
    report(&tally, "post_author");
    Ok(())
}

/// `posts update-wc-customer <map> --blog-id <id>`
pub fn update_wc_customer(config: &Config, map_file: &Path, blog_id: u64) -> Result<()> {
    let map = IdsMap::load_from_file(map_file)?;
    let mut network = Network::open(&config.db, &config.prefix)?;
    let tally = rewrite_wc_customers(
        &mut network,
        &map,
        blog_id,
        WC_ORDER_TYPES,
        WC_ORDER_STATUSES,
    )?;
    report(&tally, "customer_user");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MuportError;

    fn network() -> Network {
        let net = Network::open_memory("wp_").unwrap();
        net.install(&[1, 2]).unwrap();
        net
    }

    fn map_of(pairs: &[(u64, u64)]) -> IdsMap {
        let mut map = IdsMap::new();
        for (old, new) in pairs {
            map.set(*old, *new).unwrap();
        }
        map
    }

    #[test]
    fn author_rewrite_updates_mapped_authors() {
        let mut net = network();
        let (mapped, equal, unknown);
        {
            let guard = net.switch_to_blog(2).unwrap();
            mapped = guard.insert_post(5, "hello", "post", "publish").unwrap();
            equal = guard.insert_post(7, "about", "page", "publish").unwrap();
            unknown = guard.insert_post(9, "draft", "post", "draft").unwrap();
            guard.insert_post(0, "orphan", "post", "publish").unwrap();
        }

        let map = map_of(&[(5, 12), (7, 7)]);
        let tally = rewrite_authors(&mut net, &map, 2).unwrap();

        assert_eq!(tally.updated, 1);
        assert_eq!(tally.unchanged, vec![equal]);
        assert_eq!(tally.unresolved, vec![unknown]);

        let guard = net.switch_to_blog(2).unwrap();
        assert_eq!(guard.post_author(mapped).unwrap(), Some(12));
        assert_eq!(guard.post_author(equal).unwrap(), Some(7));
        assert_eq!(guard.post_author(unknown).unwrap(), Some(9));
    }

    #[test]
    fn author_rewrite_restores_blog_context() {
        let mut net = network();
        {
            let guard = net.switch_to_blog(2).unwrap();
            guard.insert_post(5, "hello", "post", "publish").unwrap();
        }
        rewrite_authors(&mut net, &map_of(&[(5, 12)]), 2).unwrap();
        assert_eq!(net.current_blog(), 1);
    }

    #[test]
    fn author_rewrite_second_run_adds_no_updates() {
        let mut net = network();
        let post;
        {
            let guard = net.switch_to_blog(2).unwrap();
            post = guard.insert_post(5, "hello", "post", "publish").unwrap();
        }
        let map = map_of(&[(5, 12)]);

        let first = rewrite_authors(&mut net, &map, 2).unwrap();
        assert_eq!(first.updated, 1);

        // The rewritten value is not a map key anymore, so a replay
        // leaves it alone.
        let second = rewrite_authors(&mut net, &map, 2).unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.unresolved, vec![post]);

        let guard = net.switch_to_blog(2).unwrap();
        assert_eq!(guard.post_author(post).unwrap(), Some(12));
    }

    #[test]
    fn zero_author_records_are_not_enumerated() {
        let mut net = network();
        {
            let guard = net.switch_to_blog(2).unwrap();
            guard.insert_post(0, "orphan", "post", "publish").unwrap();
        }
        let tally = rewrite_authors(&mut net, &map_of(&[(5, 12)]), 2).unwrap();
        assert_eq!(tally, RewriteTally::default());
    }

    #[test]
    fn author_rewrite_rejects_unknown_blog() {
        let mut net = network();
        let err = rewrite_authors(&mut net, &IdsMap::new(), 9).unwrap_err();
        assert!(matches!(err, MuportError::UnknownBlog(9)));
        assert_eq!(err.code(), "unknown_blog");
    }

    #[test]
    fn wc_rewrite_touches_only_allowlisted_orders() {
        let mut net = network();
        let (order, plain, draft);
        {
            let guard = net.switch_to_blog(2).unwrap();
            order = guard
                .insert_post(1, "order 1001", "shop_order", "wc-completed")
                .unwrap();
            plain = guard.insert_post(1, "a post", "post", "publish").unwrap();
            draft = guard
                .insert_post(1, "draft order", "shop_order", "draft")
                .unwrap();
            guard.set_post_meta(order, CUSTOMER_USER_META, "5").unwrap();
            guard.set_post_meta(plain, CUSTOMER_USER_META, "5").unwrap();
            guard.set_post_meta(draft, CUSTOMER_USER_META, "5").unwrap();
        }

        let map = map_of(&[(5, 12)]);
        let tally =
            rewrite_wc_customers(&mut net, &map, 2, WC_ORDER_TYPES, WC_ORDER_STATUSES).unwrap();

        assert_eq!(tally.updated, 1);
        let guard = net.switch_to_blog(2).unwrap();
        assert_eq!(
            guard.post_meta(order, CUSTOMER_USER_META).unwrap(),
            Some("12".to_string())
        );
        assert_eq!(
            guard.post_meta(plain, CUSTOMER_USER_META).unwrap(),
            Some("5".to_string())
        );
        assert_eq!(
            guard.post_meta(draft, CUSTOMER_USER_META).unwrap(),
            Some("5".to_string())
        );
    }

    #[test]
    fn wc_rewrite_skips_orders_without_owner_meta() {
        let mut net = network();
        {
            let guard = net.switch_to_blog(2).unwrap();
            guard
                .insert_post(1, "bare", "shop_order", "wc-pending")
                .unwrap();
            let blank = guard
                .insert_post(1, "blank", "shop_order", "wc-pending")
                .unwrap();
            guard.set_post_meta(blank, CUSTOMER_USER_META, "").unwrap();
        }
        let tally =
            rewrite_wc_customers(&mut net, &map_of(&[(5, 12)]), 2, WC_ORDER_TYPES, WC_ORDER_STATUSES)
                .unwrap();
        assert_eq!(tally, RewriteTally::default());
    }

    #[test]
    fn wc_rewrite_classifies_unmapped_and_equal_owners() {
        let mut net = network();
        let (unmapped, equal);
        {
            let guard = net.switch_to_blog(2).unwrap();
            unmapped = guard
                .insert_post(1, "order a", "shop_order", "wc-processing")
                .unwrap();
            equal = guard
                .insert_post(1, "order b", "shop_order", "wc-processing")
                .unwrap();
            guard.set_post_meta(unmapped, CUSTOMER_USER_META, "9").unwrap();
            guard.set_post_meta(equal, CUSTOMER_USER_META, "12").unwrap();
        }

        let map = map_of(&[(12, 12)]);
        let tally =
            rewrite_wc_customers(&mut net, &map, 2, WC_ORDER_TYPES, WC_ORDER_STATUSES).unwrap();

        assert_eq!(tally.updated, 0);
        assert_eq!(tally.unchanged, vec![equal]);
        assert_eq!(tally.unresolved, vec![unmapped]);

        let guard = net.switch_to_blog(2).unwrap();
        assert_eq!(
            guard.post_meta(unmapped, CUSTOMER_USER_META).unwrap(),
            Some("9".to_string())
        );
    }

    #[test]
    fn wc_rewrite_rejects_non_numeric_owner_as_unresolved() {
        let mut net = network();
        let order;
        {
            let guard = net.switch_to_blog(2).unwrap();
            order = guard
                .insert_post(1, "order", "shop_order", "wc-completed")
                .unwrap();
            guard.set_post_meta(order, CUSTOMER_USER_META, "abc").unwrap();
        }
        let tally =
            rewrite_wc_customers(&mut net, &map_of(&[(5, 12)]), 2, WC_ORDER_TYPES, WC_ORDER_STATUSES)
                .unwrap();
        assert_eq!(tally.unresolved, vec![order]);
        let guard = net.switch_to_blog(2).unwrap();
        assert_eq!(
            guard.post_meta(order, CUSTOMER_USER_META).unwrap(),
            Some("abc".to_string())
        );
    }
}
