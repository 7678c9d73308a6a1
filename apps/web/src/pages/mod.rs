//! Server-rendered HTML. Every page shares one layout: navigation with the
//! language toggle, the page body, and the footer.

pub mod landing;
pub mod register;

use std::fmt::Write;

use crate::i18n::Translator;

const STYLE: &str = r#"
body{margin:0;font-family:system-ui,-apple-system,"Segoe UI",sans-serif;color:#1f2937;background:#f8fafc}
a{color:#2563eb;text-decoration:none}
header{background:#fff;border-bottom:1px solid #e5e7eb}
nav{max-width:1100px;margin:0 auto;display:flex;align-items:center;gap:1.5rem;padding:1rem}
nav .logo{font-weight:800;font-size:1.4rem;color:#111827;margin-right:auto}
nav .logo small{display:block;font-size:.7rem;font-weight:500;color:#6b7280}
nav .active{font-weight:700}
.lang{font-size:.85rem}.lang .current{font-weight:700}
.button{display:inline-block;background:#2563eb;color:#fff;padding:.6rem 1.2rem;border-radius:.5rem;border:0;cursor:pointer;font-size:1rem}
.button.secondary{background:#fff;color:#2563eb;border:1px solid #2563eb}
main{max-width:1100px;margin:0 auto;padding:2rem 1rem}
section{margin:3rem 0}
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(240px,1fr));gap:1.5rem}
.card{background:#fff;border:1px solid #e5e7eb;border-radius:.75rem;padding:1.5rem}
.card.popular{border-color:#2563eb}
.error{background:#fef2f2;border:1px solid #fecaca;color:#991b1b;padding:1rem;border-radius:.5rem}
.notice{background:#ecfdf5;border:1px solid #a7f3d0;padding:1rem;border-radius:.5rem}
form label{display:block;margin:.75rem 0 .25rem;font-weight:600}
form input[type=text],form input[type=email],form input[type=tel],form input[type=password],form select{width:100%;padding:.5rem;border:1px solid #d1d5db;border-radius:.375rem;box-sizing:border-box}
form fieldset{border:1px solid #e5e7eb;border-radius:.5rem;margin:1rem 0;padding:1rem}
.checks label{display:inline-flex;gap:.35rem;font-weight:400;margin-right:1rem}
.hint{color:#6b7280;font-size:.85rem}
footer{background:#111827;color:#d1d5db;padding:2rem 1rem}
footer .cols{max-width:1100px;margin:0 auto;display:grid;grid-template-columns:2fr 1fr 1fr 1fr;gap:1.5rem}
footer a{color:#d1d5db}
"#;

/// Escapes text for HTML element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Percent-encodes a value for use inside a query string.
pub fn encode_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

/// `<ul>` of escaped items.
pub fn list_items(items: &[String]) -> String {
    let mut out = String::from("<ul>");
    for item in items {
        let _ = write!(out, "<li>{}</li>", escape(item));
    }
    out.push_str("</ul>");
    out
}

/// A full HTML document around a rendered body.
pub struct Page<'a> {
    tr: Translator<'a>,
    path: &'a str,
    title: String,
    refresh: Option<(u32, String)>,
}

impl<'a> Page<'a> {
    /// `path` is the current request path; the language toggle returns to it.
    pub fn new(tr: Translator<'a>, path: &'a str, title: impl Into<String>) -> Self {
        Self {
            tr,
            path,
            title: title.into(),
            refresh: None,
        }
    }

    /// Redirects the browser to `url` after `seconds`.
    pub fn refresh_to(mut self, seconds: u32, url: impl Into<String>) -> Self {
        self.refresh = Some((seconds, url.into()));
        self
    }

    pub fn render(&self, body: &str) -> String {
        let lang = self.tr.language().as_str();
        let refresh = self
            .refresh
            .as_ref()
            .map(|(seconds, url)| {
                format!(
                    r#"<meta http-equiv="refresh" content="{seconds};url={}">"#,
                    escape(url)
                )
            })
            .unwrap_or_default();
        format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{refresh}<title>{title} | LogBid</title>
<style>{STYLE}</style>
</head>
<body>
{nav}
<main>
{body}
</main>
{footer}
</body>
</html>
"#,
            title = escape(&self.title),
            nav = self.nav(),
            footer = self.footer(),
        )
    }

    fn nav(&self) -> String {
        let tr = &self.tr;
        let links = [
            ("/servicios", "nav.services"),
            ("/como-funciona", "nav.howItWorks"),
            ("/precios", "nav.pricing"),
            ("/soporte", "nav.support"),
        ];
        let mut out = format!(
            r#"<header><nav><a class="logo" href="/">LogBid<small>{}</small></a>"#,
            escape(&tr.t("nav.marketplaceTagline"))
        );
        for (href, key) in links {
            let class = if self.path == href { r#" class="active""# } else { "" };
            let _ = write!(out, r#"<a href="{href}"{class}>{}</a>"#, escape(&tr.t(key)));
        }
        out.push_str(&self.language_toggle());
        let _ = write!(
            out,
            r#"<a class="button" href="/register-importer">{}</a></nav></header>"#,
            escape(&tr.t("nav.login"))
        );
        out
    }

    /// `EN | ES` with the current language highlighted and the other one
    /// linking to the switch endpoint.
    fn language_toggle(&self) -> String {
        let current = self.tr.language();
        let other = current.other();
        let switch = format!(
            r#"<a href="/language/{code}?redirect={back}" title="{title}">{label}</a>"#,
            code = other.as_str(),
            back = encode_query(self.path),
            title = escape(&self.tr.t("language.switchTo")),
            label = other.as_str().to_ascii_uppercase(),
        );
        let here = format!(
            r#"<span class="current">{}</span>"#,
            current.as_str().to_ascii_uppercase()
        );
        let (first, second) = match current {
            crate::i18n::Language::En => (here, switch),
            crate::i18n::Language::Es => (switch, here),
        };
        format!(r#"<span class="lang">{first} | {second}</span>"#)
    }

    fn footer(&self) -> String {
        let t = |key: &str| escape(&self.tr.t(key));
        format!(
            r##"<footer><div class="cols">
<div><strong>LogBid</strong><p>{description}</p><p>{certified} {zim} · {fmc} · {iata}</p></div>
<div><h4>{product}</h4><a href="/servicios">{services}</a><br><a href="/precios">{pricing}</a><br><a href="#">{customs}</a><br><a href="#">{insurance}</a></div>
<div><h4>{company}</h4><a href="/como-funciona">{how}</a><br><a href="/soporte">{support}</a><br><a href="/soporte">{help}</a><br><a href="/soporte">{contact}</a></div>
<div><h4>{legal}</h4><a href="#">{terms}</a><br><a href="#">{privacy}</a><br><a href="#">{api}</a></div>
</div><p style="text-align:center">{copyright}</p></footer>"##,
            description = t("footer.description"),
            certified = t("footer.certifiedBy"),
            zim = t("footer.zimPartnership"),
            fmc = t("footer.fmcRegistered"),
            iata = t("footer.iataCertified"),
            product = t("footer.product"),
            services = t("footer.services"),
            pricing = t("nav.pricing"),
            customs = t("footer.customsClearance"),
            insurance = t("footer.cargoInsurance"),
            company = t("footer.company"),
            how = t("nav.howItWorks"),
            support = t("footer.support"),
            help = t("footer.helpCenter"),
            contact = t("footer.contact24"),
            legal = t("footer.legal"),
            terms = t("footer.terms"),
            privacy = t("footer.privacy"),
            api = t("footer.apiDocs"),
            copyright = t("footer.copyright"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Catalog, Language};

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(escape("Bogotá →"), "Bogotá →");
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(encode_query("/precios"), "/precios");
        assert_eq!(encode_query("/a b?c=d&e"), "/a%20b%3Fc%3Dd%26e");
    }

    #[test]
    fn test_layout_has_toggle_pointing_to_other_language() {
        let catalog = Catalog::embedded().unwrap();
        let html = Page::new(catalog.translator(Language::En), "/precios", "Pricing").render("<p>x</p>");
        assert!(html.contains(r#"<html lang="en">"#));
        assert!(html.contains(r#"href="/language/es?redirect=/precios""#));
        assert!(html.contains(r#"title="Switch to Spanish""#));
        assert!(html.contains(r#"<span class="current">EN</span>"#));
        assert!(html.contains(r#"<a href="/precios" class="active">Pricing</a>"#));

        let html = Page::new(catalog.translator(Language::Es), "/", "Inicio").render("");
        assert!(html.contains(r#"href="/language/en?redirect=/""#));
        assert!(html.contains(r#"<span class="current">ES</span>"#));
    }

    #[test]
    fn test_refresh_meta() {
        let catalog = Catalog::embedded().unwrap();
        let html = Page::new(catalog.translator(Language::En), "/", "Done")
            .refresh_to(5, "https://app.logbid.co/auth")
            .render("");
        assert!(html.contains(r#"content="5;url=https://app.logbid.co/auth""#));
    }
}
