use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use chrono::DateTime;
use rust_decimal::Decimal;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

use propquote_core::config::DocumentsConfig;
use propquote_core::documents::QuoteDocument;
use propquote_core::money::format_currency;

use super::{DocumentError, RenderedDocument};

pub const PROPOSAL_TEMPLATE: &str = "quotes/proposal.html.tera";
const EMBEDDED_PROPOSAL: &str = include_str!("../../../../templates/quotes/proposal.html.tera");

/// Register the filters the proposal template relies on and escape HTML output.
///
/// - `money`: `1234.5 | money` renders `1,234.50`; accepts numbers and decimal strings
/// - `percent`: `"0.15" | percent` renders `15%`
/// - `long_date`: RFC 3339 timestamp to `April 1, 2026`
pub fn register_template_filters(tera: &mut Tera) {
    tera.autoescape_on(vec![".html.tera", ".html"]);
    tera.register_filter("money", tera_money_filter);
    tera.register_filter("percent", tera_percent_filter);
    tera.register_filter("long_date", tera_long_date_filter);
}

fn decimal_from_value(value: &tera::Value, filter: &str) -> tera::Result<Decimal> {
    match value {
        tera::Value::Null => Ok(Decimal::ZERO),
        tera::Value::Number(number) => Decimal::from_str(&number.to_string())
            .map_err(|e| tera::Error::msg(format!("{filter} filter: {e}"))),
        tera::Value::String(text) => Decimal::from_str(text.trim())
            .map_err(|e| tera::Error::msg(format!("{filter} filter: `{text}` ({e})"))),
        other => Err(tera::Error::msg(format!("{filter} filter expects a number, got {other}"))),
    }
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    Ok(tera::Value::String(format_currency(decimal_from_value(value, "money")?)))
}

fn tera_percent_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let percent = (decimal_from_value(value, "percent")? * Decimal::ONE_HUNDRED).normalize();
    Ok(tera::Value::String(format!("{percent}%")))
}

fn tera_long_date_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("long_date filter expects an RFC 3339 string"))?;
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| tera::Error::msg(format!("long_date filter: `{raw}` ({e})")))?;
    Ok(tera::Value::String(parsed.format("%B %-d, %Y").to_string()))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branding {
    pub company_name: String,
    pub primary_color: String,
}

impl Branding {
    pub fn from_config(config: &DocumentsConfig) -> Self {
        Self {
            company_name: config.company_name.clone(),
            primary_color: config.primary_color.clone(),
        }
    }
}

/// Renders proposal layouts to HTML, then to PDF when wkhtmltopdf is installed.
#[derive(Clone, Debug)]
pub struct DocumentRenderer {
    tera: Tera,
    branding: Branding,
    wkhtmltopdf_path: Option<PathBuf>,
}

impl DocumentRenderer {
    /// Loads templates from the configured directory, falling back to the
    /// built-in proposal when the directory has none.
    pub fn from_config(config: &DocumentsConfig) -> Result<Self, DocumentError> {
        let branding = Branding::from_config(config);
        let on_disk = config.template_dir.join(PROPOSAL_TEMPLATE);

        let renderer = if on_disk.exists() {
            let mut tera = Tera::new(&template_glob(&config.template_dir))
                .map_err(|e| DocumentError::Template(e.to_string()))?;
            register_template_filters(&mut tera);
            info!(
                event_name = "document.templates.loaded",
                template_dir = %config.template_dir.display(),
                "proposal templates loaded from disk"
            );
            Self { tera, branding, wkhtmltopdf_path: locate_wkhtmltopdf() }
        } else {
            Self::with_embedded_templates(branding)?
        };
        Ok(renderer)
    }

    pub fn with_embedded_templates(branding: Branding) -> Result<Self, DocumentError> {
        let mut tera = Tera::default();
        register_template_filters(&mut tera);
        tera.add_raw_template(PROPOSAL_TEMPLATE, EMBEDDED_PROPOSAL)
            .map_err(|e| DocumentError::Template(e.to_string()))?;

        Ok(Self { tera, branding, wkhtmltopdf_path: locate_wkhtmltopdf() })
    }

    /// Always produce HTML, even when a converter is installed.
    pub fn html_only(mut self) -> Self {
        self.wkhtmltopdf_path = None;
        self
    }

    pub fn produces_pdf(&self) -> bool {
        self.wkhtmltopdf_path.is_some()
    }

    pub fn render_html(&self, document: &QuoteDocument) -> Result<String, DocumentError> {
        let mut context = Context::new();
        context.insert("doc", document);
        context.insert("company_name", &self.branding.company_name);
        context.insert("primary_color", &self.branding.primary_color);

        self.tera
            .render(PROPOSAL_TEMPLATE, &context)
            .map_err(|e| DocumentError::Template(template_error_chain(&e)))
    }

    pub async fn render(
        &self,
        document: &QuoteDocument,
        correlation_id: &str,
    ) -> Result<RenderedDocument, DocumentError> {
        let html = self.render_html(document)?;

        let Some(converter) = self.wkhtmltopdf_path.as_deref() else {
            return Ok(RenderedDocument::Html(html));
        };

        match convert_html_to_pdf(&html, converter).await {
            Ok(pdf) => {
                info!(
                    event_name = "document.rendered",
                    correlation_id,
                    quote_number = %document.header.quote_number,
                    size = pdf.len(),
                    "proposal PDF generated"
                );
                Ok(RenderedDocument::Pdf(pdf))
            }
            Err(conversion_error) => {
                warn!(
                    event_name = "document.pdf.conversion_failed",
                    correlation_id,
                    error = %conversion_error,
                    "PDF conversion failed, falling back to HTML"
                );
                Ok(RenderedDocument::Html(html))
            }
        }
    }
}

fn template_glob(dir: &Path) -> String {
    format!("{}/**/*.tera", dir.display())
}

fn template_error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn locate_wkhtmltopdf() -> Option<PathBuf> {
    match which::which("wkhtmltopdf") {
        Ok(path) => {
            info!(path = %path.display(), "wkhtmltopdf found");
            Some(path)
        }
        Err(_) => {
            warn!("wkhtmltopdf not found in PATH - documents will be served as HTML");
            None
        }
    }
}

async fn convert_html_to_pdf(html: &str, converter: &Path) -> Result<Vec<u8>, DocumentError> {
    let temp_dir = std::env::temp_dir();
    let stem = format!("proposal_{}", uuid::Uuid::new_v4());
    let html_path = temp_dir.join(format!("{stem}.html"));
    let pdf_path = temp_dir.join(format!("{stem}.pdf"));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(converter)
        .args(["--page-size", "Letter", "--encoding", "utf-8", "--quiet"])
        .args(["--margin-top", "12mm", "--margin-bottom", "12mm"])
        .args(["--margin-left", "10mm", "--margin-right", "10mm"])
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let result = match output {
        Ok(output) if output.status.success() => tokio::fs::read(&pdf_path).await.map_err(Into::into),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            error!(stderr = %stderr, "wkhtmltopdf failed");
            Err(DocumentError::Conversion(stderr))
        }
        Err(io_error) => Err(DocumentError::Io(io_error)),
    };

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use propquote_core::documents::QuoteDocument;
    use propquote_core::domain::labor::{LaborItemCategory, LaborLineDraft, MaterialLine};
    use propquote_core::domain::quote::{
        BillingPeriod, CustomerInfo, FloorPlan, Quote, QuoteId, QuoteLineItem,
    };

    use super::{tera_money_filter, tera_percent_filter, Branding, DocumentRenderer};
    use crate::documents::RenderedDocument;

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::with_embedded_templates(Branding {
            company_name: "Harbor Smart Homes".to_string(),
            primary_color: "#204060".to_string(),
        })
        .expect("embedded template parses")
        .html_only()
    }

    fn line(name: &str, category: &str, quantity: u32, cents: i64) -> QuoteLineItem {
        QuoteLineItem {
            product_name: name.to_string(),
            category: category.to_string(),
            domain: Some("security".to_string()),
            quantity,
            unit_price: Decimal::new(cents, 2),
            monthly_rate: None,
            annual_rate: None,
            description: None,
        }
    }

    fn quote() -> Quote {
        Quote {
            id: QuoteId("q-42".to_string()),
            quote_number: "PQ-2042".to_string(),
            customer: CustomerInfo { name: "Lena Ortiz".to_string(), ..CustomerInfo::default() },
            property: None,
            billing_period: BillingPeriod::Monthly,
            line_items: vec![
                line("Smart Lock Pro", "hardware", 12, 24_900),
                QuoteLineItem {
                    monthly_rate: Some(Decimal::new(2_999, 2)),
                    ..line("Premium Monitoring", "subscription_premium", 1, 2_999)
                },
            ],
            device_placements: Vec::new(),
            floor_plans: vec![FloorPlan {
                title: "Ground floor".to_string(),
                image_ref: "plans/ground.png".to_string(),
            }],
            scans: Vec::new(),
            photo_pairs: Vec::new(),
            notes: None,
            created_at: Utc.with_ymd_and_hms(2026, 4, 1, 9, 30, 0).single().expect("valid time"),
            valid_until: None,
        }
    }

    fn labor() -> Vec<propquote_core::domain::labor::LaborLineItem> {
        vec![LaborLineDraft {
            category: LaborItemCategory::Installation,
            task_name: "Smart Lock Installation".to_string(),
            description: "Install 12 smart locks".to_string(),
            scope_of_work: "Remove existing deadbolts.\n\nInstall and pair locks.".to_string(),
            estimated_hours: Decimal::new(1_250, 2),
            hourly_rate: Decimal::new(85, 0),
            quantity: 12,
            materials_needed: vec![MaterialLine::new(
                "Strike plate kit",
                Decimal::new(12, 0),
                "ea",
                Decimal::new(1_200, 2),
            )],
            is_optional: false,
        }
        .finish(1)]
    }

    #[test]
    fn money_filter_accepts_strings_and_numbers() {
        let args = HashMap::new();
        assert_eq!(
            tera_money_filter(&tera::Value::String("1234.5".into()), &args).expect("string"),
            tera::Value::String("1,234.50".into())
        );
        assert_eq!(
            tera_money_filter(&serde_json::json!(2.005), &args).expect("number"),
            tera::Value::String("2.01".into())
        );
        assert!(tera_money_filter(&serde_json::json!(["x"]), &args).is_err());
    }

    #[test]
    fn percent_filter_scales_rates() {
        let rendered = tera_percent_filter(&tera::Value::String("0.15".into()), &HashMap::new())
            .expect("percent");
        assert_eq!(rendered, tera::Value::String("15%".into()));
    }

    #[test]
    fn html_contains_every_populated_section_and_totals() {
        let document = QuoteDocument::from_quote(&quote(), &labor()).expect("document");
        let html = renderer().render_html(&document).expect("render");

        assert!(html.contains("Harbor Smart Homes"));
        assert!(html.contains("PQ-2042"));
        assert!(html.contains("April 1, 2026"));
        assert!(html.contains("Premium Monitoring"));
        assert!(html.contains("Smart Lock Pro"));
        assert!(html.contains("Bulk discount (10%)"));
        assert!(html.contains("Smart Lock Installation"));
        assert!(html.contains("Strike plate kit"));
        assert!(html.contains("Year 1 total"));
        assert!(!html.contains("3D scans"), "empty sections are omitted");
    }

    #[test]
    fn unfetched_images_render_as_unavailable() {
        let mut document = QuoteDocument::from_quote(&quote(), &labor()).expect("document");
        document.embed_images(|_| None);
        let html = renderer().render_html(&document).expect("render");

        assert!(html.contains("Image unavailable"));
        assert!(html.contains("Ground floor"));
    }

    #[tokio::test]
    async fn html_only_renderer_returns_html_bytes() {
        let document = QuoteDocument::from_quote(&quote(), &[]).expect("document");
        let rendered = renderer().render(&document, "req-1").await.expect("render");

        match rendered {
            RenderedDocument::Html(html) => assert!(html.contains("PQ-2042")),
            RenderedDocument::Pdf(_) => panic!("html_only renderer must not convert"),
        }
    }
}
