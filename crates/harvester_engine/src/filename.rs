use sha2::{Digest, Sha256};
use url::Url;

/// Deterministic snapshot file name for a feed URL: `{short_hash}.html`.
///
/// The `hl` localization parameter is ignored so one snapshot serves every
/// requested language; other query parameters identify the feed and are kept.
pub fn snapshot_filename(feed_url: &str) -> String {
    let key = match Url::parse(feed_url.trim()) {
        Ok(mut url) => {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "hl")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }
            url.to_string()
        }
        Err(_) => feed_url.trim().to_string(),
    };
    format!("{}.html", short_hash(&key))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::snapshot_filename;

    #[test]
    fn language_parameter_does_not_change_the_name() {
        let plain = snapshot_filename("https://maps.example.com/place?cid=42");
        let localized = snapshot_filename("https://maps.example.com/place?cid=42&hl=pt-BR");
        assert_eq!(plain, localized);
        assert!(plain.ends_with(".html"));
        assert_eq!(plain.len(), 16 + ".html".len());
    }

    #[test]
    fn different_feeds_get_different_names() {
        assert_ne!(
            snapshot_filename("https://maps.example.com/place?cid=1"),
            snapshot_filename("https://maps.example.com/place?cid=2")
        );
        assert_eq!(
            snapshot_filename("https://maps.example.com/place?hl=en"),
            snapshot_filename("https://maps.example.com/place")
        );
    }
}
