//! Session establishment via the onboarding task flow.
//!
//! Login is a multi-step server-driven state machine: each POST to the
//! onboarding endpoint returns a `flow_token` plus the next subtask to
//! answer, and the token must be threaded through every step. A guest token
//! authorizes the flow before any cookies exist, and the first subtask
//! requires executing a served JavaScript challenge through the
//! [`ChallengeSolver`](crate::ChallengeSolver).

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::challenge::ChallengeSolver;
use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use crate::raw::str_at;
use crate::transport::Transport;

/// Everything the login flow may need from the caller up front.
#[derive(Debug, Clone, Copy)]
pub struct LoginArgs<'a> {
    /// Email, phone number, or screen name
    pub auth_info_1: &'a str,
    /// Fallback identifier when the server asks for a second one
    pub auth_info_2: Option<&'a str>,
    pub password: &'a str,
    /// Current one-time code, when the account has two-factor auth enabled
    pub totp_code: Option<&'a str>,
}

pub(crate) async fn login(
    transport: &Transport,
    endpoints: &Endpoints,
    solver: &dyn ChallengeSolver,
    args: LoginArgs<'_>,
) -> Result<Value> {
    activate_guest_token(transport, endpoints).await?;

    let mut flow = Flow::new(transport, endpoints);
    flow.start().await?;

    // Bounded to the number of distinct subtasks the flow can serve.
    for _ in 0..12 {
        let Some(subtask_id) = flow.current_subtask_id() else {
            break;
        };
        debug!(subtask = %subtask_id, "handling login subtask");
        match subtask_id.as_str() {
            "LoginJsInstrumentationSubtask" => {
                let source = transport.get_text(&endpoints.ui_metrics()).await?;
                let solved = solver.solve(&source).await?;
                flow.execute(json!({
                    "subtask_id": "LoginJsInstrumentationSubtask",
                    "js_instrumentation": {
                        "response": solved.to_string(),
                        "link": "next_link"
                    }
                }))
                .await?;
            }
            "LoginEnterUserIdentifierSSO" => {
                flow.execute(json!({
                    "subtask_id": "LoginEnterUserIdentifierSSO",
                    "settings_list": {
                        "setting_responses": [{
                            "key": "user_identifier",
                            "response_data": {"text_data": {"result": args.auth_info_1}}
                        }],
                        "link": "next_link"
                    }
                }))
                .await?;
            }
            "LoginEnterAlternateIdentifierSubtask" => {
                let identifier = args.auth_info_2.ok_or_else(|| {
                    Error::Auth("server asked for a second identifier but none was given".into())
                })?;
                flow.execute(json!({
                    "subtask_id": "LoginEnterAlternateIdentifierSubtask",
                    "enter_text": {"text": identifier, "link": "next_link"}
                }))
                .await?;
            }
            "LoginEnterPassword" => {
                flow.execute(json!({
                    "subtask_id": "LoginEnterPassword",
                    "enter_password": {"password": args.password, "link": "next_link"}
                }))
                .await?;
            }
            "AccountDuplicationCheck" => {
                flow.execute(json!({
                    "subtask_id": "AccountDuplicationCheck",
                    "check_logged_in_account": {"link": "AccountDuplicationCheck_false"}
                }))
                .await?;
            }
            "LoginTwoFactorAuthChallenge" => {
                let code = args.totp_code.ok_or_else(|| {
                    Error::Auth("account requires a two-factor code but none was given".into())
                })?;
                flow.execute(json!({
                    "subtask_id": "LoginTwoFactorAuthChallenge",
                    "enter_text": {"text": code, "link": "next_link"}
                }))
                .await?;
            }
            "LoginAcid" => {
                return Err(Error::Auth(
                    "account requires an emailed confirmation code; log in from a browser first"
                        .into(),
                ));
            }
            "LoginSuccessSubtask" => {
                info!("login flow completed");
                transport.set_guest_token(None);
                return Ok(flow.into_response());
            }
            "DenyLoginSubtask" => {
                let reason = flow
                    .subtask_text()
                    .unwrap_or_else(|| "login denied".to_string());
                return Err(Error::Auth(reason));
            }
            other => {
                return Err(Error::Auth(format!("unsupported login subtask: {other}")));
            }
        }
    }

    // Some accounts finish without an explicit success subtask; the session
    // cookie is the ground truth.
    if transport.is_authenticated() {
        transport.set_guest_token(None);
        return Ok(flow.into_response());
    }
    Err(Error::Auth("login flow ended without a session".into()))
}

pub(crate) async fn logout(transport: &Transport, endpoints: &Endpoints) -> Result<()> {
    transport
        .post_json(&endpoints.account_logout(), None)
        .await?;
    transport.replace_cookies(Default::default(), true);
    Ok(())
}

async fn activate_guest_token(transport: &Transport, endpoints: &Endpoints) -> Result<()> {
    let response = transport
        .post_json(&endpoints.guest_activate(), None)
        .await?;
    let token = str_at(&response, &["guest_token"])
        .ok_or_else(|| Error::Auth("guest activation returned no token".into()))?;
    transport.set_guest_token(Some(token.to_string()));
    Ok(())
}

/// Driver for the onboarding task state machine.
struct Flow<'a> {
    transport: &'a Transport,
    endpoints: &'a Endpoints,
    flow_token: Option<String>,
    response: Value,
}

impl<'a> Flow<'a> {
    fn new(transport: &'a Transport, endpoints: &'a Endpoints) -> Self {
        Self {
            transport,
            endpoints,
            flow_token: None,
            response: Value::Null,
        }
    }

    /// Open the flow; the response carries the first subtask.
    async fn start(&mut self) -> Result<()> {
        let url = format!("{}?flow_name=login", self.endpoints.onboarding_task());
        let body = json!({
            "input_flow_data": {
                "flow_context": {
                    "debug_overrides": {},
                    "start_location": {"location": "splash_screen"}
                }
            },
            "subtask_versions": {
                "action_list": 2,
                "alert_dialog": 1,
                "app_download_cta": 1,
                "check_logged_in_account": 1,
                "choice_selection": 3,
                "contacts_live_sync_permission_prompt": 0,
                "cta": 7,
                "email_verification": 2,
                "end_flow": 1,
                "enter_date": 1,
                "enter_email": 2,
                "enter_password": 5,
                "enter_phone": 2,
                "enter_text": 5,
                "generic_urt": 3,
                "in_app_notification": 1,
                "js_instrumentation": 1,
                "menu_dialog": 1,
                "notifications_permission_prompt": 2,
                "open_account": 2,
                "open_home_timeline": 1,
                "open_link": 1,
                "phone_verification": 4,
                "privacy_options": 1,
                "security_key": 3,
                "select_avatar": 4,
                "select_banner": 2,
                "settings_list": 7,
                "show_code": 1,
                "sign_up": 2,
                "sign_up_review": 4,
                "tweet_selection_urt": 1,
                "update_users": 1,
                "upload_media": 1,
                "user_recommendations_list": 4,
                "user_recommendations_urt": 1,
                "wait_spinner": 3,
                "web_modal": 1
            }
        });
        self.response = self.transport.post_json(&url, Some(&body)).await?;
        self.capture_token()
    }

    /// Answer the current subtask and advance.
    async fn execute(&mut self, subtask_input: Value) -> Result<()> {
        let token = self
            .flow_token
            .clone()
            .ok_or_else(|| Error::Auth("flow token missing mid-flow".into()))?;
        let body = json!({
            "flow_token": token,
            "subtask_inputs": [subtask_input]
        });
        self.response = self
            .transport
            .post_json(&self.endpoints.onboarding_task(), Some(&body))
            .await?;
        self.capture_token()
    }

    fn capture_token(&mut self) -> Result<()> {
        match str_at(&self.response, &["flow_token"]) {
            Some(token) => {
                self.flow_token = Some(token.to_string());
                Ok(())
            }
            None => Err(Error::Auth("onboarding response carried no flow token".into())),
        }
    }

    fn current_subtask_id(&self) -> Option<String> {
        self.response
            .get("subtasks")?
            .as_array()?
            .first()?
            .get("subtask_id")?
            .as_str()
            .map(str::to_string)
    }

    /// Human-readable text of the current subtask, when it carries one.
    fn subtask_text(&self) -> Option<String> {
        let subtask = self.response.get("subtasks")?.as_array()?.first()?;
        crate::raw::find_first(subtask, "text")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn into_response(self) -> Value {
        self.response
    }
}
