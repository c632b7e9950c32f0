use crate::config::SiteSettings;
use crate::presentation::views::{BrandView, LayoutChrome, NavigationLinkView, PageMetaView};

/// Site-wide layout pieces: brand, navigation, footer and default metadata.
#[derive(Clone)]
pub struct ChromeService {
    chrome: LayoutChrome,
    public_url: String,
}

impl ChromeService {
    pub fn new(site: &SiteSettings) -> Self {
        let public_url = site.public_url.as_str().trim_end_matches('/').to_string();
        let chrome = LayoutChrome {
            brand: BrandView {
                title: site.title.clone(),
                href: "/".to_string(),
            },
            navigation: vec![
                NavigationLinkView {
                    label: "Home".to_string(),
                    href: "/".to_string(),
                },
                NavigationLinkView {
                    label: "Contacts".to_string(),
                    href: "/contacts".to_string(),
                },
            ],
            footer: site.footer.clone(),
            meta: PageMetaView {
                title: site.title.clone(),
                description: site.description.clone(),
                canonical: format!("{public_url}/"),
            },
        };

        Self { chrome, public_url }
    }

    pub fn load(&self) -> LayoutChrome {
        self.chrome.clone()
    }

    /// Chrome for a page at `path`, with its canonical URL set.
    pub fn for_path(&self, path: &str) -> LayoutChrome {
        let canonical = canonical_url(&self.public_url, path);
        self.load().with_canonical(canonical)
    }
}

pub fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
