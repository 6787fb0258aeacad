//! Student-facing email notifications.
//!
//! The manager renders an [`EmailTemplate`] on entry into certain steps and
//! hands the result to a [`Notifier`]. The state machine never sends mail.

pub mod email;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::{RenderedDocument, escape_html};
use crate::error::NotifyError;
use crate::onboarding::OnboardingRequest;

pub use email::{LogNotifier, SmtpConfig, SmtpNotifier};

/// Placement test platform used when the admin doesn't give another link.
pub const DEFAULT_TEST_LINK: &str = "https://cet.educationtlc.com/login";

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl From<RenderedDocument> for Attachment {
    fn from(doc: RenderedDocument) -> Self {
        Self {
            file_name: doc.file_name,
            mime_type: doc.mime_type,
            bytes: doc.bytes,
        }
    }
}

/// A fully rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub attachments: Vec<Attachment>,
}

/// Outbound email delivery.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError>;
}

/// Login for the online placement test, sent with the invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAccess {
    #[serde(default = "default_test_link")]
    pub link: String,
    pub username: String,
    pub password: String,
}

fn default_test_link() -> String {
    DEFAULT_TEST_LINK.to_string()
}

/// The emails the pipeline sends.
#[derive(Debug, Clone)]
pub enum EmailTemplate<'a> {
    /// Entering `test_sent`.
    TestInvitation {
        request: &'a OnboardingRequest,
        access: Option<&'a TestAccess>,
    },
    /// Entering `class_proposed`.
    LevelProposal {
        request: &'a OnboardingRequest,
        level: &'a str,
        start_date: NaiveDate,
        /// Public base URL for the accept link.
        base_url: &'a str,
        notes: Option<&'a str>,
    },
    /// Entering `contract_sent`.
    Contract {
        request: &'a OnboardingRequest,
        document: RenderedDocument,
    },
}

impl EmailTemplate<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TestInvitation { .. } => "test_invitation",
            Self::LevelProposal { .. } => "level_proposal",
            Self::Contract { .. } => "contract",
        }
    }

    pub fn render(self) -> OutgoingEmail {
        match self {
            Self::TestInvitation { request, access } => render_test_invitation(request, access),
            Self::LevelProposal {
                request,
                level,
                start_date,
                base_url,
                notes,
            } => render_level_proposal(request, level, start_date, base_url, notes),
            Self::Contract { request, document } => render_contract(request, document),
        }
    }
}

/// Public link the student clicks to accept a class proposal.
///
/// The start date travels as `dd/mm/yyyy`, percent-encoded.
pub fn accept_link(base_url: &str, request_id: Uuid, start_date: NaiveDate) -> String {
    format!(
        "{}/api/public/proposals/{}/accept?start_date={}",
        base_url.trim_end_matches('/'),
        request_id,
        start_date.format("%d%%2F%m%%2F%Y")
    )
}

/// Public page where the student declines a class proposal and says why.
pub fn reject_link(base_url: &str, request_id: Uuid) -> String {
    format!(
        "{}/api/public/proposals/{}/reject",
        base_url.trim_end_matches('/'),
        request_id
    )
}

fn wrap(inner: &str) -> String {
    format!(
        "<div style=\"font-family: Arial, sans-serif; line-height: 1.6; color: #333;\">\n{inner}\
         <p>Atentamente,</p>\n<p><strong>El equipo de TLC</strong></p>\n</div>\n"
    )
}

fn render_test_invitation(
    request: &OnboardingRequest,
    access: Option<&TestAccess>,
) -> OutgoingEmail {
    let mut body = format!(
        "<h2>¡Hola {}!</h2>\n\
         <p>Nos alegra que estés interesado en nuestros cursos. Para ubicarte en el nivel \
         adecuado realizaremos un test en línea que evalúa uso de la lengua, comprensión \
         escrita y oral, y producción escrita y oral.</p>\n",
        escape_html(&request.first_name)
    );

    let link = access.map_or(DEFAULT_TEST_LINK, |a| a.link.as_str());
    body.push_str(&format!(
        "<p>Ingresa a la plataforma: <a href=\"{0}\">{0}</a></p>\n",
        escape_html(link)
    ));
    if let Some(access) = access {
        body.push_str(&format!(
            "<p>Usuario: <strong>{}</strong><br>Contraseña: <strong>{}</strong></p>\n",
            escape_html(&access.username),
            escape_html(&access.password)
        ));
    }
    body.push_str(
        "<p><strong>Importante:</strong> si deseas empezar el curso desde cero no es \
         necesario que realices el test. Solo infórmanos.</p>\n",
    );

    OutgoingEmail {
        to: request.email.clone(),
        subject: "Su prueba de TLC está lista".to_string(),
        html_body: wrap(&body),
        attachments: Vec::new(),
    }
}

fn render_level_proposal(
    request: &OnboardingRequest,
    level: &str,
    start_date: NaiveDate,
    base_url: &str,
    notes: Option<&str>,
) -> OutgoingEmail {
    let accept = accept_link(base_url, request.id, start_date);
    let reject = reject_link(base_url, request.id);

    let mut body = format!(
        "<h2>CLASS PROPOSITION</h2>\n\
         <p>Estimado/a,</p>\n\
         <p>Le informamos que hemos completado la revisión de su evaluación.</p>\n\
         <p>Datos del candidato: {} ({}).</p>\n\
         <p>El candidato ha obtenido un nivel <strong>{}</strong>.</p>\n\
         <p>Proponemos comenzar el proceso de incorporación a partir de <strong>{}</strong>.</p>\n",
        escape_html(&request.full_name()),
        escape_html(&request.email),
        escape_html(level),
        start_date.format("%d/%m/%Y")
    );
    if let Some(notes) = notes.filter(|n| !n.trim().is_empty()) {
        body.push_str(&format!(
            "<p>Información adicional:</p>\n<p>{}</p>\n",
            escape_html(notes)
        ));
    }
    body.push_str(&format!(
        "<p>Por favor, confirme si esta fecha es adecuada.</p>\n\
         <p><a href=\"{}\">Aceptar</a> &nbsp; <a href=\"{}\">Rechazar</a></p>\n",
        escape_html(&accept),
        escape_html(&reject)
    ));

    OutgoingEmail {
        to: request.email.clone(),
        subject: format!(
            "Evaluación completada para {} - Nivel {}",
            request.full_name(),
            level
        ),
        html_body: wrap(&body),
        attachments: Vec::new(),
    }
}

fn render_contract(request: &OnboardingRequest, document: RenderedDocument) -> OutgoingEmail {
    let name = request.full_name();
    let body = format!(
        "<p>Estimado/a {},</p>\n\
         <p>Adjunto encontrará el contrato de servicios para su revisión y firma.</p>\n\
         <p>Si tiene alguna pregunta o inquietud, no dude en contactarnos.</p>\n",
        escape_html(&name)
    );

    OutgoingEmail {
        to: request.email.clone(),
        subject: format!("Contrato de Servicios - {name}"),
        html_body: wrap(&body),
        attachments: vec![document.into()],
    }
}
