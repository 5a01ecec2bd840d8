//! Content types for build outputs.
//!
//! The static service guesses types on its own; these entries pin the ones
//! browsers are strict about (`WebAssembly.instantiateStreaming` refuses
//! anything but `application/wasm`).

use std::path::Path;

pub mod types {
    pub const WASM: &str = "application/wasm";
    pub const JS: &str = "text/javascript; charset=utf-8";
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const SVG: &str = "image/svg+xml";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
}

/// Pinned content type for a path, by extension.
pub fn from_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?;
    let ty = match ext.to_ascii_lowercase().as_str() {
        "wasm" => types::WASM,
        "js" | "mjs" => types::JS,
        "html" | "htm" => types::HTML,
        "css" => types::CSS,
        "json" | "map" => types::JSON,
        "svg" => types::SVG,
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pins_build_outputs() {
        assert_eq!(from_path("/webgame.wasm"), Some("application/wasm"));
        assert_eq!(from_path("/webgame.js"), Some(types::JS));
        assert_eq!(from_path("/INDEX.HTML"), Some(types::HTML));
    }

    #[test]
    fn unknown_extensions_are_left_alone() {
        assert_eq!(from_path("/logo.png"), None);
        assert_eq!(from_path("/"), None);
        assert_eq!(from_path("/Makefile"), None);
    }
}
