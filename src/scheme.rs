use std::fmt;

/// Prefix selecting the object store transfer
const OBJECT_STORE_PREFIX: &str = "s3";

/// Scheme of a source locator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceScheme {
    /// Object store locator such as `s3://bucket/key`
    ObjectStore,
    /// Anything else, downloaded over HTTP(S)
    Http,
}

impl fmt::Display for SourceScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceScheme::ObjectStore => "object-store",
            SourceScheme::Http => "http",
        };
        f.write_str(s)
    }
}

/// Detect scheme from source locator
pub fn detect(locator: &str) -> SourceScheme {
    if locator.starts_with(OBJECT_STORE_PREFIX) {
        SourceScheme::ObjectStore
    } else {
        SourceScheme::Http
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod detect {
        use super::*;

        #[test]
        fn s3_url() {
            assert_eq!(detect("s3://bucket/key"), SourceScheme::ObjectStore);
        }

        #[test]
        fn bare_s3_prefix() {
            assert_eq!(detect("s3bucket/key"), SourceScheme::ObjectStore);
        }

        #[test]
        fn uppercase_s3() {
            assert_eq!(detect("S3://bucket/key"), SourceScheme::Http);
        }

        #[test]
        fn leading_whitespace() {
            assert_eq!(detect(" s3://bucket/key"), SourceScheme::Http);
        }

        #[test]
        fn https() {
            assert_eq!(
                detect("https://example.com/f.tar.gz"),
                SourceScheme::Http
            );
        }

        #[test]
        fn https_to_s3_endpoint() {
            assert_eq!(
                detect("https://bucket.s3.us-east-1.amazonaws.com/key"),
                SourceScheme::Http
            );
        }

        #[test]
        fn short_locator() {
            assert_eq!(detect("s"), SourceScheme::Http);
        }

        #[test]
        fn multibyte_locator() {
            assert_eq!(detect("ß3://x"), SourceScheme::Http);
        }
    }
}
