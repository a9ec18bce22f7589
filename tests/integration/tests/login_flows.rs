//! Credential verification integration tests.

use authws_federation::{CredentialValidator, WsAuthProvider};
use authws_federation_soap::SoapTransport;
use wiremock::matchers::{body_string_contains, header, method};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{login_response, TestEnv};

fn provider(env: &TestEnv) -> anyhow::Result<WsAuthProvider<SoapTransport>> {
    let transport = SoapTransport::from_ws_config(&env.config)?;
    Ok(WsAuthProvider::new(env.config.clone(), transport))
}

#[tokio::test]
async fn test_valid_credentials_are_accepted() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    Mock::given(method("POST"))
        .and(header("SOAPAction", "\"http://tempuri.org/ValidarLogin\""))
        .and(body_string_contains("<sLogin>asilva</sLogin>"))
        .and(body_string_contains("<sSenha>p&amp;ss</sSenha>"))
        .and(body_string_contains("<sChave>abc</sChave>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_response("true")))
        .expect(1)
        .mount(&env.server)
        .await;

    assert!(provider(&env)?.validate_password("asilva", "p&ss").await?);
    Ok(())
}

#[tokio::test]
async fn test_rejected_credentials_are_denied() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve(
        "ValidarLogin",
        ResponseTemplate::new(200).set_body_string(login_response("false")),
    )
    .await;

    assert!(!provider(&env)?.validate_password("asilva", "wrong").await?);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_webservice_denies_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve("ValidarLogin", ResponseTemplate::new(502)).await;

    assert!(!provider(&env)?.validate_password("asilva", "s3cret").await?);
    Ok(())
}
