//! Startup banner.

use std::path::Path;

/// Server configuration shown at startup.
pub struct BannerInfo<'a> {
    pub model: &'a str,
    pub bind: &'a str,
    pub upstream: &'a str,
    pub knowledge: &'a Path,
    pub frontend_origin: &'a str,
}

pub fn render_banner(info: &BannerInfo) -> String {
    format!(
        r#"
   ╔═══════════════════════════════════════╗
   ║          S T A T S C O U T            ║
   ║   live cricket, one question away     ║
   ╚═══════════════════════════════════════╝

   version    {}
   model      {}
   listening  {}
   upstream   {}
   knowledge  {}
   frontend   {}
"#,
        env!("CARGO_PKG_VERSION"),
        info.model,
        info.bind,
        info.upstream,
        info.knowledge.display(),
        info.frontend_origin,
    )
}

pub fn print_banner(info: &BannerInfo) {
    println!("{}", render_banner(info));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn banner_lists_settings() {
        let banner = render_banner(&BannerInfo {
            model: "claude-sonnet-4-20250514",
            bind: "0.0.0.0:8000",
            upstream: "https://api.sportradar.com/cricket-t2/en",
            knowledge: &PathBuf::from("/tmp/knowledge.json"),
            frontend_origin: "http://localhost:5173",
        });
        assert!(banner.contains("0.0.0.0:8000"));
        assert!(banner.contains("cricket-t2/en"));
        assert!(banner.contains("/tmp/knowledge.json"));
    }
}
