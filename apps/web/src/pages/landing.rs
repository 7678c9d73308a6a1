//! Marketing pages.

use std::fmt::Write;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::Html,
};

use super::{escape, list_items, Page};
use crate::i18n::{Lang, Translator};
use crate::state::AppState;

const FAQ_KEYS: [&str; 5] = ["faq.q1", "faq.q2", "faq.q3", "faq.q4", "faq.q5"];

pub async fn home(State(state): State<AppState>, Lang(lang): Lang) -> Html<String> {
    Html(render_home(state.catalog.translator(lang)))
}

pub async fn services(State(state): State<AppState>, Lang(lang): Lang) -> Html<String> {
    Html(render_services(state.catalog.translator(lang)))
}

pub async fn how_it_works(State(state): State<AppState>, Lang(lang): Lang) -> Html<String> {
    Html(render_how_it_works(state.catalog.translator(lang)))
}

pub async fn pricing(State(state): State<AppState>, Lang(lang): Lang) -> Html<String> {
    Html(render_pricing(state.catalog.translator(lang)))
}

pub async fn support(State(state): State<AppState>, Lang(lang): Lang) -> Html<String> {
    Html(render_support(state.catalog.translator(lang)))
}

pub async fn not_found(
    State(state): State<AppState>,
    Lang(lang): Lang,
    uri: Uri,
) -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(render_not_found(state.catalog.translator(lang), uri.path())),
    )
}

fn cta_buttons(tr: &Translator<'_>, importer_key: &str, agent_key: &str) -> String {
    format!(
        r#"<p><a class="button" href="/register-importer">{}</a> <a class="button secondary" href="/register-agent">{}</a></p>"#,
        escape(&tr.t(importer_key)),
        escape(&tr.t(agent_key)),
    )
}

fn faq(tr: &Translator<'_>) -> String {
    let mut out = format!("<section><h2>{}</h2>", escape(&tr.t("faq.title")));
    for key in FAQ_KEYS {
        let _ = write!(
            out,
            "<details><summary>{}</summary><p>{}</p></details>",
            escape(&tr.t(&format!("{key}.question"))),
            escape(&tr.t(&format!("{key}.answer"))),
        );
    }
    out.push_str("</section>");
    out
}

fn cards(tr: &Translator<'_>, items: &[(&str, &str)]) -> String {
    let mut out = String::from(r#"<div class="grid">"#);
    for (title, description) in items {
        let _ = write!(
            out,
            r#"<div class="card"><h3>{}</h3><p>{}</p></div>"#,
            escape(&tr.t(title)),
            escape(&tr.t(description)),
        );
    }
    out.push_str("</div>");
    out
}

pub fn render_home(tr: Translator<'_>) -> String {
    let t = |key: &str| escape(&tr.t(key));
    let mut body = format!(
        r#"<section class="hero"><p>{badge}</p><h1>{title}</h1><p>{subtitle}</p>{ctas}<p class="hint">{number_one}</p></section>"#,
        badge = t("hero.badge"),
        title = t("hero.title"),
        subtitle = t("hero.subtitle"),
        ctas = cta_buttons(&tr, "hero.ctaImporter", "hero.ctaAgent"),
        number_one = t("hero.platformNumberOne"),
    );

    let stats = [
        ("800+", "stats.activeImporters"),
        ("500+", "stats.verifiedAgents"),
        ("70%", "stats.timeReduction"),
        ("24/7", "stats.premiumSupport"),
    ];
    body.push_str(r#"<section class="grid">"#);
    for (value, key) in stats {
        let _ = write!(body, r#"<div class="card"><h2>{value}</h2><p>{}</p></div>"#, t(key));
    }
    body.push_str("</section>");

    let _ = write!(
        body,
        r#"<section><h2>{} {}</h2><p>{}</p>{}</section>"#,
        t("hero.yourBusinessFlow"),
        t("hero.asImporter"),
        t("hero.discoverHowLogBid"),
        cards(
            &tr,
            &[
                ("rightContent.step1.title", "rightContent.step1.description"),
                ("rightContent.step2.title", "rightContent.step2.description"),
                ("rightContent.step3.title", "rightContent.step3.description"),
                ("rightContent.step4.title", "rightContent.step4.description"),
            ],
        ),
    );

    let _ = write!(
        body,
        "<section>{}</section>",
        cards(
            &tr,
            &[
                ("benefits.savings", "benefits.savingsDescription"),
                ("benefits.transparency", "benefits.transparencyDescription"),
                ("benefits.agents", "benefits.agentsDescription"),
                ("benefits.realTime", "benefits.realTimeDescription"),
            ],
        ),
    );

    let _ = write!(
        body,
        r#"<section><h2>{title}</h2><div class="grid">"#,
        title = t("testimonials.title")
    );
    for who in ["maria", "carlos"] {
        let _ = write!(
            body,
            r#"<blockquote class="card"><p>“{}”</p><footer><strong>{}</strong>, {} · {}</footer></blockquote>"#,
            t(&format!("testimonials.{who}.content")),
            t(&format!("testimonials.{who}.name")),
            t(&format!("testimonials.{who}.role")),
            t(&format!("testimonials.{who}.company")),
        );
    }
    body.push_str("</div></section>");

    body.push_str(&faq(&tr));

    let _ = write!(
        body,
        r#"<section class="card"><h2>{}</h2><p>{}</p>{}<div class="grid">"#,
        t("cta.title"),
        t("cta.subtitle"),
        cta_buttons(&tr, "cta.startImporter", "cta.joinAgent"),
    );
    for stat in ["free", "commission", "support"] {
        let _ = write!(
            body,
            "<div><strong>{}</strong> {}</div>",
            t(&format!("cta.stats.{stat}")),
            t(&format!("cta.stats.{stat}Subtitle")),
        );
    }
    body.push_str("</div></section>");

    Page::new(tr, "/", tr.t("hero.title")).render(&body)
}

pub fn render_services(tr: Translator<'_>) -> String {
    let t = |key: &str| escape(&tr.t(key));
    let mut body = format!(
        r#"<section><h1>{}</h1><p>{}</p><div class="grid">"#,
        t("services.title"),
        t("services.subtitle")
    );
    for service in ["fcl", "lcl", "air"] {
        let _ = write!(
            body,
            r#"<div class="card"><h3>{}</h3><p>{}</p>{}<a href="/register-importer">{}</a></div>"#,
            t(&format!("services.{service}.title")),
            t(&format!("services.{service}.description")),
            list_items(&tr.list(&format!("services.{service}.features"))),
            t("services.exploreService"),
        );
    }
    body.push_str("</div></section>");
    Page::new(tr, "/servicios", tr.t("services.title")).render(&body)
}

pub fn render_how_it_works(tr: Translator<'_>) -> String {
    let t = |key: &str| escape(&tr.t(key));
    let mut body = format!(
        r#"<section><h1>{}</h1><p>{}</p><div class="grid">"#,
        t("howItWorks.title"),
        t("howItWorks.subtitle")
    );
    for (n, step) in ["step1", "step2", "step3"].iter().enumerate() {
        let _ = write!(
            body,
            r#"<div class="card"><h3>{}. {}</h3><p>{}</p>{}</div>"#,
            n + 1,
            t(&format!("howItWorks.{step}.title")),
            t(&format!("howItWorks.{step}.description")),
            list_items(&tr.list(&format!("howItWorks.{step}.features"))),
        );
    }
    let _ = write!(
        body,
        r#"</div><p><a class="button" href="/register-importer">{}</a></p><p class="hint">{}</p></section>"#,
        t("howItWorks.cta"),
        t("howItWorks.promise"),
    );

    let _ = write!(body, "<section><h2>{}</h2><ol>", t("businessFlow.importerTitle"));
    for phase in ["creation", "quotations", "evaluation", "confirmation", "execution"] {
        let _ = write!(
            body,
            "<li><strong>{}</strong>: {}</li>",
            t(&format!("businessFlow.{phase}")),
            t(&format!("businessFlow.{phase}Description")),
        );
    }
    let _ = write!(
        body,
        r#"</ol><blockquote class="card"><p>“{}”</p><footer>{}, {}</footer></blockquote></section>"#,
        t("testimonial.quote"),
        t("testimonial.name"),
        t("testimonial.position"),
    );

    let _ = write!(
        body,
        "<section><h2>{}</h2><p>{} {}. {}</p><ol>",
        t("businessFlowAgent.title"),
        t("hero.yourBusinessFlow"),
        t("hero.asAgent"),
        t("hero.discoverHowLogBidAgent"),
    );
    for n in 1..=4 {
        let _ = write!(
            body,
            "<li><strong>{}</strong>: {}</li>",
            t(&format!("businessFlowAgent.step{n}Title")),
            t(&format!("businessFlowAgent.step{n}Description")),
        );
    }
    let _ = write!(
        body,
        "</ol>{}",
        cards(
            &tr,
            &[
                ("benefitsAgent.revenue", "benefitsAgent.revenueDescription"),
                ("benefitsAgent.time", "benefitsAgent.timeDescription"),
                ("benefitsAgent.importers", "benefitsAgent.importersDescription"),
                ("benefitsAgent.reputation", "benefitsAgent.reputationDescription"),
            ],
        ),
    );
    let _ = write!(
        body,
        r#"<blockquote class="card"><p>“{}”</p><footer>{}, {}</footer></blockquote>{}</section>"#,
        t("testimonialAgent.quote"),
        t("testimonialAgent.name"),
        t("testimonialAgent.position"),
        cta_buttons(&tr, "cta.startImporter", "cta.joinAgent"),
    );

    Page::new(tr, "/como-funciona", tr.t("howItWorks.title")).render(&body)
}

pub fn render_pricing(tr: Translator<'_>) -> String {
    let t = |key: &str| escape(&tr.t(key));
    let mut body = format!(
        r#"<section><h1>{}</h1><p>{}</p><div class="grid">"#,
        t("pricing.title"),
        t("pricing.subtitle")
    );
    for (plan, href, popular) in [
        ("importers", "/register-importer", false),
        ("agents", "/register-agent", true),
    ] {
        let badge = if popular {
            format!(r#"<p class="hint">{}</p>"#, t("pricing.agents.popular"))
        } else {
            String::new()
        };
        let _ = write!(
            body,
            r#"<div class="card{class}">{badge}<h3>{kind}</h3><p>{subtitle}</p><h2>{price} <small>{period}</small></h2><p>{description}</p>{features}<a class="button" href="{href}">{cta}</a></div>"#,
            class = if popular { " popular" } else { "" },
            kind = t(&format!("pricing.{plan}.type")),
            subtitle = t(&format!("pricing.{plan}.subtitle")),
            price = t(&format!("pricing.{plan}.price")),
            period = t(&format!("pricing.{plan}.period")),
            description = t(&format!("pricing.{plan}.description")),
            features = list_items(&tr.list(&format!("pricing.{plan}.features"))),
            cta = t(&format!("pricing.{plan}.cta")),
        );
    }
    let _ = write!(
        body,
        r#"</div><p>{} <a href="/soporte">{}</a></p></section>"#,
        t("pricing.enterprise"),
        t("pricing.contactSales"),
    );
    Page::new(tr, "/precios", tr.t("pricing.title")).render(&body)
}

pub fn render_support(tr: Translator<'_>) -> String {
    let t = |key: &str| escape(&tr.t(key));
    let mut body = format!(
        r#"<section><h1>{}</h1><p>{}</p><div class="grid">"#,
        t("support.title"),
        t("support.subtitle")
    );
    for channel in ["liveChat", "phoneSupport", "emailSupport"] {
        let _ = write!(
            body,
            r#"<div class="card"><h3>{}</h3><p>{}</p><p class="hint">{}</p></div>"#,
            t(&format!("support.{channel}.title")),
            t(&format!("support.{channel}.description")),
            t(&format!("support.{channel}.availability")),
        );
    }
    let _ = write!(
        body,
        r#"</div></section><section class="card"><h2>{}</h2><p>{}</p><p><a class="button" href="mailto:soporte@logbid.co">{}</a> <a class="button secondary" href="tel:+576010000000">{}</a></p></section>"#,
        t("support.helpNow.title"),
        t("support.helpNow.description"),
        t("support.helpNow.startChat"),
        t("support.helpNow.callNow"),
    );
    body.push_str(&faq(&tr));
    Page::new(tr, "/soporte", tr.t("support.title")).render(&body)
}

pub fn render_not_found(tr: Translator<'_>, path: &str) -> String {
    let body = format!(
        r#"<section><h1>404</h1><p>{}</p><p><code>{}</code></p><p><a class="button" href="/">LogBid</a></p></section>"#,
        escape(&tr.t("errors.notFound")),
        escape(path),
    );
    Page::new(tr, path, tr.t("errors.notFound")).render(&body)
}
