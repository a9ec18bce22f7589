//! Common test utilities and fixtures.

use std::time::Duration;

use authws_federation::{MatchKey, SyncEngine, WsConfig};
use authws_federation_soap::SoapTransport;
use authws_model::LocalIdentity;
use authws_storage::InMemoryDirectory;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Realm assigned to created identities.
pub const REALM: Uuid = Uuid::from_u128(0x5eed);

/// A student record as the webservice returns it.
pub struct Student {
    pub code: &'static str,
    pub login: &'static str,
    pub name: &'static str,
    pub email: &'static str,
}

impl Student {
    pub const fn new(
        code: &'static str,
        login: &'static str,
        name: &'static str,
        email: &'static str,
    ) -> Self {
        Self {
            code,
            login,
            name,
            email,
        }
    }

    fn to_xml(&self) -> String {
        format!(
            "<wsAluno><Codigo>{}</Codigo><LoginPortal>{}</LoginPortal><Nome>{}</Nome><Email>{}</Email></wsAluno>",
            self.code, self.login, self.name, self.email
        )
    }
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>{body}</soap:Body>
</soap:Envelope>"#
    )
}

/// Builds a `GetAlunos` response.
pub fn students_response(students: &[Student]) -> String {
    let items: String = students.iter().map(Student::to_xml).collect();
    envelope(&format!(
        r#"<GetAlunosResponse xmlns="http://tempuri.org/"><GetAlunosResult>{items}</GetAlunosResult></GetAlunosResponse>"#
    ))
}

/// Builds a `ValidarLogin` response.
pub fn login_response(success: &str) -> String {
    envelope(&format!(
        r#"<ValidarLoginResponse xmlns="http://tempuri.org/"><ValidarLoginResult><Sucesso>{success}</Sucesso></ValidarLoginResult></ValidarLoginResponse>"#
    ))
}

/// A local identity owned by the webservice auth method.
pub fn ws_identity(id: i64, username: &str, idnumber: &str) -> LocalIdentity {
    LocalIdentity::new(id, REALM, username, "ws")
        .with_idnumber(idnumber)
        .with_email(format!("{username}@example.edu"))
}

/// Five students used as the baseline population.
pub fn cohort() -> Vec<Student> {
    vec![
        Student::new("10", "asilva", "Ana Silva", "ana@example.edu"),
        Student::new("11", "bsouza", "Bruno Souza", "bruno@example.edu"),
        Student::new("12", "clima", "Carla Lima", "carla@example.edu"),
        Student::new("13", "dcosta", "Diego da Costa", "diego@example.edu"),
        Student::new("14", "erocha", "Eva Rocha", "eva@example.edu"),
    ]
}

/// Test environment with a mocked webservice and a seeded directory.
pub struct TestEnv {
    /// Mock webservice.
    pub server: MockServer,
    /// Provider configuration pointing at the mock.
    pub config: WsConfig,
    /// Local directory.
    pub directory: InMemoryDirectory,
}

impl TestEnv {
    /// Creates an environment with an empty directory.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_identities(Vec::new(), MatchKey::Idnumber).await
    }

    /// Creates an environment seeded with identities.
    pub async fn with_identities(
        identities: Vec<LocalIdentity>,
        match_key: MatchKey,
    ) -> anyhow::Result<Self> {
        // Initialize tracing for tests
        let _ = tracing_subscriber::fmt()
            .with_env_filter("authws=debug")
            .with_test_writer()
            .try_init();

        let server = MockServer::start().await;
        let config = WsConfig::builder()
            .server_url(format!("{}/Service.asmx?wsdl", server.uri()))
            .default_params("sChave:abc")
            .realm_id(REALM)
            .match_key(match_key)
            .connection_timeout(Duration::from_secs(2))
            .read_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            server,
            config,
            directory: InMemoryDirectory::with_identities(identities),
        })
    }

    /// Serves a student list for `GetAlunos`.
    pub async fn serve_students(&self, students: &[Student]) {
        self.serve("GetAlunos", ResponseTemplate::new(200).set_body_string(students_response(students)))
            .await;
    }

    /// Serves a response for an operation.
    pub async fn serve(&self, operation: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/Service.asmx"))
            .and(header(
                "SOAPAction",
                format!("\"http://tempuri.org/{operation}\"").as_str(),
            ))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Builds a sync engine over the SOAP transport.
    pub fn engine(&self) -> anyhow::Result<SyncEngine<SoapTransport>> {
        let transport = SoapTransport::from_ws_config(&self.config)?;
        Ok(SyncEngine::new(self.config.clone(), transport))
    }

    /// Finds an identity by username.
    pub fn identity(&self, username: &str) -> Option<LocalIdentity> {
        self.directory
            .state()
            .identities
            .into_iter()
            .find(|i| i.username == username)
    }
}
