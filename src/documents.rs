//! Contract document generation.
//!
//! The contract is rendered to a self-contained HTML document that is
//! attached to the contract email. Rendering is pure; callers decide when
//! to invoke it (only on entry into `contract_sent`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::onboarding::OnboardingRequest;

/// Commercial terms entered by admin when sending the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub course_type: String,
    /// Weekdays the class meets, e.g. `["Monday", "Wednesday"]`.
    pub days: Vec<String>,
    /// Free-form time slot, e.g. "7:00 - 8:30 a.m.".
    pub schedule: String,
    /// "virtual" / "presencial".
    pub modality: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_value: Decimal,
    pub currency: String,
    pub payment_method: String,
    pub payment_dates: String,
    pub start_date: NaiveDate,
}

impl ContractTerms {
    fn check(&self) -> Result<(), DocumentError> {
        let missing = [
            ("course_type", self.course_type.trim().is_empty()),
            ("days", self.days.iter().all(|d| d.trim().is_empty())),
            ("schedule", self.schedule.trim().is_empty()),
            ("modality", self.modality.trim().is_empty()),
            ("payment_method", self.payment_method.trim().is_empty()),
            ("payment_dates", self.payment_dates.trim().is_empty()),
        ]
        .into_iter()
        .filter(|(_, empty)| *empty)
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(DocumentError::IncompleteTerms(missing.join(", ")));
        }
        if self.total_value <= Decimal::ZERO {
            return Err(DocumentError::IncompleteTerms(
                "total_value must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A rendered binary document ready for attachment or upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Renders contracts for a request.
pub trait DocumentGenerator: Send + Sync {
    fn render_contract(
        &self,
        request: &OnboardingRequest,
        terms: &ContractTerms,
    ) -> Result<RenderedDocument, DocumentError>;
}

/// HTML contract renderer.
#[derive(Debug, Clone)]
pub struct HtmlContractGenerator {
    /// Legal name of the school printed on the contract.
    pub provider_name: String,
}

impl Default for HtmlContractGenerator {
    fn default() -> Self {
        Self {
            provider_name: "The Language Corp".to_string(),
        }
    }
}

impl DocumentGenerator for HtmlContractGenerator {
    fn render_contract(
        &self,
        request: &OnboardingRequest,
        terms: &ContractTerms,
    ) -> Result<RenderedDocument, DocumentError> {
        terms.check()?;

        let student = request.full_name();
        let days = terms
            .days
            .iter()
            .map(|d| translate_day(d.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let rows = [
            ("Estudiante", student.clone()),
            ("Documento", request.id_number.clone()),
            ("Correo", request.email.clone()),
            ("Teléfono", request.phone_number.clone()),
            ("Curso", terms.course_type.clone()),
            ("Nivel", request.level.clone().unwrap_or_else(|| "-".to_string())),
            ("Días", days),
            ("Horario", terms.schedule.clone()),
            ("Modalidad", terms.modality.clone()),
            (
                "Valor total",
                format!("{} {}", terms.total_value.round_dp(2), terms.currency),
            ),
            ("Forma de pago", terms.payment_method.clone()),
            ("Fechas de pago", terms.payment_dates.clone()),
            ("Fecha de inicio", terms.start_date.format("%d/%m/%Y").to_string()),
        ];

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\">");
        html.push_str(&format!(
            "<title>Contrato de servicios - {}</title></head>\n<body>\n",
            escape_html(&student)
        ));
        html.push_str("<h1>CONTRATO DE PRESTACIÓN DE SERVICIOS EDUCATIVOS</h1>\n");
        html.push_str(&format!(
            "<p>Entre {} y {} se celebra el presente contrato bajo los siguientes términos:</p>\n",
            escape_html(&self.provider_name),
            escape_html(&student)
        ));
        html.push_str("<table>\n");
        for (label, value) in rows {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td></tr>\n",
                label,
                escape_html(&value)
            ));
        }
        html.push_str("</table>\n");
        html.push_str("<p>Firma del estudiante: ______________________</p>\n");
        html.push_str("</body>\n</html>\n");

        Ok(RenderedDocument {
            file_name: format!("contrato_{}.html", student.split_whitespace().collect::<Vec<_>>().join("_")),
            mime_type: "text/html".to_string(),
            bytes: html.into_bytes(),
        })
    }
}

fn translate_day(day: &str) -> &str {
    match day {
        "Monday" => "Lunes",
        "Tuesday" => "Martes",
        "Wednesday" => "Miércoles",
        "Thursday" => "Jueves",
        "Friday" => "Viernes",
        "Saturday" => "Sábado",
        "Sunday" => "Domingo",
        other => other,
    }
}

/// Minimal HTML escaping for user-provided text.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::onboarding::NewLead;
    use rust_decimal_macros::dec;

    pub(crate) fn sample_terms() -> ContractTerms {
        ContractTerms {
            course_type: "General English".to_string(),
            days: vec!["Monday".to_string(), "Wednesday".to_string()],
            schedule: "7:00 - 8:30 a.m.".to_string(),
            modality: "virtual".to_string(),
            total_value: dec!(3500000),
            currency: "COP".to_string(),
            payment_method: "Transferencia".to_string(),
            payment_dates: "1 de cada mes".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        }
    }

    fn request() -> OnboardingRequest {
        NewLead {
            first_name: "Ana María".to_string(),
            last_name: "Gómez".to_string(),
            email: "ana@example.com".to_string(),
            id_number: "1020304050".to_string(),
            ..Default::default()
        }
        .into_request("rep@school.test")
    }

    #[test]
    fn renders_contract_with_terms() {
        let doc = HtmlContractGenerator::default()
            .render_contract(&request(), &sample_terms())
            .unwrap();
        assert_eq!(doc.mime_type, "text/html");
        assert_eq!(doc.file_name, "contrato_Ana_María_Gómez.html");

        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(html.contains("Ana María Gómez"));
        assert!(html.contains("1020304050"));
        assert!(html.contains("Lunes, Miércoles"));
        assert!(html.contains("3500000 COP"));
        assert!(html.contains("02/11/2026"));
    }

    #[test]
    fn escapes_user_text() {
        let mut terms = sample_terms();
        terms.course_type = "<script>alert(1)</script>".to_string();
        let doc = HtmlContractGenerator::default()
            .render_contract(&request(), &terms)
            .unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn incomplete_terms_are_rejected() {
        let mut terms = sample_terms();
        terms.schedule = " ".to_string();
        terms.days.clear();
        let err = HtmlContractGenerator::default()
            .render_contract(&request(), &terms)
            .unwrap_err();
        let DocumentError::IncompleteTerms(msg) = err;
        assert!(msg.contains("days"));
        assert!(msg.contains("schedule"));
    }

    #[test]
    fn non_positive_total_is_rejected() {
        let mut terms = sample_terms();
        terms.total_value = Decimal::ZERO;
        assert!(HtmlContractGenerator::default()
            .render_contract(&request(), &terms)
            .is_err());
    }
}
