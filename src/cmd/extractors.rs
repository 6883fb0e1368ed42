use tuber::client::parse_uri;
use tuber::{ExtractorRegistry, ResolveError};

/// Print registered extractor names in lookup order.
pub fn list(registry: &ExtractorRegistry) {
    for name in registry.names() {
        println!("{name}");
    }
}

/// Print the extractor that would handle `uri`, or why none would.
pub fn which(registry: &ExtractorRegistry, uri: &str) {
    let url = match parse_uri(uri) {
        Ok(url) => url,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    match registry.find_name_for(&url) {
        Some(name) => println!("{name}"),
        None => eprintln!("{}", ResolveError::NoExtractor(url.to_string())),
    }
}
