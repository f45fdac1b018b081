/// Input validation helpers
///
/// Field checks shared by the account and image handlers.
use crate::error::{BookmarksError, BookmarksResult};
use url::Url;

/// Image formats accepted for bookmarking, matched against the URL extension
pub const VALID_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Maximum length of an image source URL
pub const MAX_URL_LENGTH: usize = 2000;

/// Maximum length of an image title (and of its slug)
pub const MAX_TITLE_LENGTH: usize = 200;

/// Build a URL slug from free text.
///
/// Lowercases, drops everything but ASCII letters, digits, underscores,
/// hyphens and whitespace, then collapses whitespace/hyphen runs into a single
/// hyphen and trims leading and trailing hyphens and underscores.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Extension of the last path segment of a parsed URL, lowercased
pub fn url_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    last.rsplit_once('.')
        .map(|(stem, ext)| (stem, ext.to_lowercase()))
        .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
        .map(|(_, ext)| ext)
}

/// Validate an image source URL and return its extension
pub fn validate_image_url(url: &str) -> BookmarksResult<String> {
    if url.len() > MAX_URL_LENGTH {
        return Err(BookmarksError::Validation(format!(
            "URL must be at most {} characters",
            MAX_URL_LENGTH
        )));
    }

    let parsed = Url::parse(url).map_err(|e| {
        tracing::debug!(url = %url, error = %e, "Rejected image URL");
        BookmarksError::Validation("Enter a valid URL".to_string())
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(BookmarksError::Validation("Enter a valid URL".to_string()));
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() && !host.starts_with('.') => {}
        _ => return Err(BookmarksError::Validation("Enter a valid URL".to_string())),
    }

    match url_extension(&parsed) {
        Some(ext) if VALID_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(BookmarksError::Validation(
            "The given URL does not match valid image formats (jpg, jpeg, png).".to_string(),
        )),
    }
}

/// Validate an image title
pub fn validate_title(title: &str) -> BookmarksResult<()> {
    let title = title.trim();
    if title.is_empty() {
        return Err(BookmarksError::Validation("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(BookmarksError::Validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

/// Validate a username: 1-150 characters of letters, digits and @/./+/-/_
pub fn validate_username(username: &str) -> BookmarksResult<()> {
    if username.is_empty() || username.len() > 150 {
        return Err(BookmarksError::Validation(
            "Username must be between 1 and 150 characters".to_string(),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(BookmarksError::Validation(
            "Username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }

    Ok(())
}

/// Convert `validator` derive errors into a single validation error
pub fn from_validation_errors(errors: validator::ValidationErrors) -> BookmarksError {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    fields.sort();

    BookmarksError::Validation(fields.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Django -- Reinhardt!  "), "django-reinhardt");
        assert_eq!(slugify("snake_case title"), "snake_case-title");
        assert_eq!(slugify("__trim__"), "trim");
        assert_eq!(slugify("Ça va?"), "a-va");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_validate_image_url() {
        assert_eq!(validate_image_url("https://example.com/cat.JPG").unwrap(), "jpg");
        assert_eq!(validate_image_url("http://example.com/a.b/dog.jpeg").unwrap(), "jpeg");
        assert_eq!(validate_image_url("https://example.com/x.png").unwrap(), "png");
        assert_eq!(validate_image_url("https://example.com/cat.jpg?size=large").unwrap(), "jpg");

        assert!(validate_image_url("https://example.com/clip.gif").is_err());
        assert!(validate_image_url("https://example.com/noextension").is_err());
        assert!(validate_image_url("ftp://example.com/cat.jpg").is_err());
        assert!(validate_image_url("https://example.com/photos.jpg/").is_err());

        let too_long = format!("https://example.com/{}.jpg", "a".repeat(MAX_URL_LENGTH));
        assert!(validate_image_url(&too_long).is_err());
    }

    #[test]
    fn test_validate_image_url_rejects_malformed() {
        for url in [
            "https://exa mple.com/a.jpg",
            "https://.jpg",
            "http://example.png",
            "https://[bad/x.jpg",
            "not a url.jpg",
            "mailto:someone@example.com.jpg",
        ] {
            assert!(validate_image_url(url).is_err(), "{} should be rejected", url);
        }
    }

    #[test]
    fn test_url_extension_reads_path_only() {
        let parse = |s: &str| Url::parse(s).unwrap();
        assert_eq!(url_extension(&parse("https://example.com/photos/cat")), None);
        assert_eq!(url_extension(&parse("https://example.png/")), None);
        assert_eq!(url_extension(&parse("https://example.com/cat.Png")), Some("png".to_string()));
        assert_eq!(url_extension(&parse("https://example.com/.png")), None);
    }

    #[test]
    fn test_validate_title() {
        assert!(validate_title("Sunset").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_92").is_ok());
        assert!(validate_username("a.b+c@d-e").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }
}
