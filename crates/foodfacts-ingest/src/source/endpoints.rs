//! Remote URL builders

fn join(base_url: &str, name: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// Build the manifest URL
pub fn manifest_url(base_url: &str, manifest_name: &str) -> String {
    join(base_url, manifest_name)
}

/// Build the URL of one dataset file listed in the manifest
pub fn dataset_url(base_url: &str, filename: &str) -> String {
    join(base_url, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_url() {
        assert_eq!(
            manifest_url("https://challenges.coode.sh/food/data/json", "index.txt"),
            "https://challenges.coode.sh/food/data/json/index.txt"
        );
    }

    #[test]
    fn test_dataset_url_tolerates_extra_slashes() {
        assert_eq!(
            dataset_url("http://localhost:8080/data/", "/products_01.json.gz"),
            "http://localhost:8080/data/products_01.json.gz"
        );
    }
}
