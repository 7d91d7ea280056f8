use sha2::{Digest, Sha256};

/// Kubernetes label values and most generated object names are limited to 63 characters.
pub const MAX_RESOURCE_NAME_LENGTH: usize = 63;

const HASH_LENGTH: usize = 8;

/// Joins `prefix` and `suffix` into a name usable for the NGINX data plane objects of a Gateway.
///
/// Names that would exceed [`MAX_RESOURCE_NAME_LENGTH`] keep the suffix intact, shorten the
/// prefix and splice in a short hash of the full name so that distinct inputs stay distinct.
///
/// The limit only holds for suffixes of at most 53 characters. A longer suffix leaves no room for
/// the prefix, which is then dropped, and the result (`<hash>-<suffix>`) is longer than 63.
pub fn create_nginx_resource_name(prefix: &str, suffix: &str) -> String {
    let name = format!("{prefix}-{suffix}");
    if name.len() <= MAX_RESOURCE_NAME_LENGTH {
        return name;
    }

    let digest = Sha256::digest(name.as_bytes());
    let hash = &hex::encode(digest)[..HASH_LENGTH];

    match MAX_RESOURCE_NAME_LENGTH.checked_sub(2 + HASH_LENGTH + suffix.len()) {
        Some(max_prefix_length) if max_prefix_length > 0 => {
            format!("{}-{hash}-{suffix}", truncate(prefix, max_prefix_length))
        }
        _ => format!("{hash}-{suffix}"),
    }
}

fn truncate(value: &str, max_length: usize) -> &str {
    match value.char_indices().nth(max_length) {
        Some((index, _)) => &value[..index],
        None => value,
    }
}
