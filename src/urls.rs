use crate::ThumbnailError;
use url::Url;

/// Set `key=value` on the query string of `url`, replacing any existing
/// values for `key` while keeping every other parameter in place.
///
/// ```rust
/// use thumbnail_cache::modify_url_query;
///
/// let url = modify_url_query(
///     "https://bi.example.com/explore/?slice_id=1&standalone=0",
///     "standalone",
///     "true",
/// )
/// .unwrap();
/// assert_eq!(url.as_str(), "https://bi.example.com/explore/?slice_id=1&standalone=true");
/// ```
pub fn modify_url_query(url: &str, key: &str, value: &str) -> Result<Url, ThumbnailError> {
    let mut parsed =
        Url::parse(url).map_err(|e| ThumbnailError::InvalidUrl(format!("{url}: {e}")))?;

    let mut replaced = false;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter_map(|(k, v)| {
            if k != key {
                return Some((k.into_owned(), v.into_owned()));
            }
            if replaced {
                return None;
            }
            replaced = true;
            Some((k.into_owned(), value.to_string()))
        })
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        query.extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if !replaced {
            query.append_pair(key, value);
        }
    }

    Ok(parsed)
}
