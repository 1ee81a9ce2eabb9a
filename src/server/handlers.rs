//! Handlers HTTP : descriptions, icônes, contrôle SOAP, abonnements.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post, MethodRouter};
use axum::Router;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::events::{parse_callback, parse_timeout};
use crate::model::Service;
use crate::server::{ServerState, SoapArgs, DEVICE_DESC_PATH};
use crate::soap::{
    build_action_response, build_soap_fault, parse_soap_action, SoapError, UpnpErrorCode,
};
use crate::state_variables::StateVariable;

static RE_SOAP_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"urn:schemas-upnp-org:service:([^:#]+):(\d+)#(.+)"$"#).unwrap());

/// Assemble le routeur du serveur : endpoints UPnP, URL de présentation et
/// routes utilisateur.
pub(crate) fn router(
    inner: Arc<ServerState>,
    presentation: Option<MethodRouter<Arc<ServerState>>>,
    extra_routes: Vec<(String, MethodRouter<Arc<ServerState>>)>,
) -> Router {
    let mut router = Router::new()
        .route(DEVICE_DESC_PATH, get(device_desc_handler))
        .route("/device/{*path}", get(device_icon_handler))
        .route("/services/desc/{id}", get(service_desc_handler))
        .route("/services/control/{id}", post(service_control_handler))
        .route("/services/eventSub/{id}", any(service_event_sub_handler));

    if let Some(handler) = presentation {
        let path = inner.root_desc.device.presentation_url.clone();
        if path.starts_with('/') {
            router = router.route(&path, handler);
        } else if !path.is_empty() {
            warn!("presentation URL '{}' is not a local path, not routed", path);
        }
    }

    for (pattern, handler) in extra_routes {
        router = router.route(&pattern, handler);
    }

    router.with_state(inner)
}

fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Réponse XML avec les en-têtes imposés par l'UPnP Device Architecture :
/// server, date, content-type (content-length est posé par la couche HTTP).
fn xml_response(inner: &ServerState, status: StatusCode, body: String) -> Response {
    (
        status,
        [
            (header::SERVER, inner.server_string.clone()),
            (header::DATE, rfc1123_now()),
            (
                header::CONTENT_TYPE,
                "text/xml; charset=\"utf-8\"".to_string(),
            ),
        ],
        body,
    )
        .into_response()
}

/// La langue de contenu n'est renvoyée que si la requête portait
/// ACCEPT-LANGUAGE.
fn echo_content_language(headers: &HeaderMap, mut response: Response) -> Response {
    if headers.contains_key(header::ACCEPT_LANGUAGE) {
        response.headers_mut().insert(
            header::CONTENT_LANGUAGE,
            header::HeaderValue::from_static("en-US"),
        );
    }
    response
}

/// GET /device/devicedesc.xml
async fn device_desc_handler(State(inner): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    info!("device description requested");

    // la description porte toujours le ConfigID courant
    let mut desc = inner.root_desc.clone();
    desc.config_id = inner.config_id.val();

    let xml = match desc.to_xml() {
        Ok(xml) => xml,
        Err(e) => {
            error!("couldn't marshal device description: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "can't create device description",
            )
                .into_response();
        }
    };

    echo_content_language(&headers, xml_response(&inner, StatusCode::OK, xml))
}

/// GET /device/<chemin d'icône>
async fn device_icon_handler(
    State(inner): State<Arc<ServerState>>,
    Path(path): Path<String>,
) -> Response {
    info!("icon requested: {}", path);

    if path.split('/').any(|part| part == "..") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let full = std::path::Path::new(&inner.cfg.icon_root_dir).join(&path);
    let Ok(data) = tokio::fs::read(&full).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let content_type = match full.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    };

    ([(header::CONTENT_TYPE, content_type)], data).into_response()
}

/// GET /services/desc/<id>.xml
async fn service_desc_handler(
    State(inner): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let id = id.strip_suffix(".xml").unwrap_or(&id);
    info!("service description for {} requested", id);

    let Some(svc) = inner.services.get(id) else {
        return (
            StatusCode::NOT_FOUND,
            format!("service '{}' is unknown", id),
        )
            .into_response();
    };

    // la SCPD aussi porte le ConfigID courant
    let mut desc = svc.desc().clone();
    desc.config_id = inner.config_id.val();

    let xml = match desc.to_xml() {
        Ok(xml) => xml,
        Err(e) => {
            error!("cannot render service description: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "can't create service description",
            )
                .into_response();
        }
    };

    echo_content_language(&headers, xml_response(&inner, StatusCode::OK, xml))
}

/// Fault SOAP : corps XML d'erreur, HTTP 500.
fn soap_fault_response(inner: &ServerState, err: SoapError) -> Response {
    error!("{}", err);
    match build_soap_fault(&err) {
        Ok(xml) => xml_response(inner, StatusCode::INTERNAL_SERVER_ERROR, xml),
        Err(e) => {
            error!("SOAP fault cannot be built: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /services/control/<id>
async fn service_control_handler(
    State(inner): State<Arc<ServerState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!("service control request received for '{}'", id);

    // le service doit exister
    let Some(svc) = inner.services.get(&id) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("service '{}' does not exist", id),
        )
            .into_response();
    };

    // l'en-tête SOAPACTION désigne le type de service et l'action
    let soap_action = headers
        .get("SOAPACTION")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let Some(caps) = RE_SOAP_ACTION.captures(soap_action) else {
        return soap_fault_response(
            &inner,
            SoapError::new(
                UpnpErrorCode::InvalidAction,
                format!("invalid SOAPACTION: {}", soap_action),
            ),
        );
    };
    let (kind, version, action) = (&caps[1], &caps[2], caps[3].to_string());

    // le type doit être celui du service, la version couverte par la sienne
    let requested_type = format!("urn:schemas-upnp-org:service:{}", kind);
    if svc.service_type() != requested_type {
        return soap_fault_response(
            &inner,
            SoapError::new(
                UpnpErrorCode::InvalidAction,
                format!("unknown service type: {}", requested_type),
            ),
        );
    }
    let svc_version: u32 = svc.version().parse().unwrap_or(0);
    let req_version: u32 = version.parse().unwrap_or(u32::MAX);
    if req_version > svc_version {
        return soap_fault_response(
            &inner,
            SoapError::new(
                UpnpErrorCode::InvalidAction,
                format!("requested service version too high: {}", version),
            ),
        );
    }

    if !svc.has_action(&action) {
        return soap_fault_response(
            &inner,
            SoapError::new(
                UpnpErrorCode::InvalidAction,
                format!("unknown action: {}", action),
            ),
        );
    }

    // un handler doit avoir été enregistré pour (service, action)
    let handler = inner
        .soap_handlers
        .read()
        .unwrap()
        .get(&format!("{}#{}", id, action))
        .cloned();
    let Some(handler) = handler else {
        return soap_fault_response(
            &inner,
            SoapError::new(
                UpnpErrorCode::OptActionNotImplemented,
                format!("no handler for action '{}#{}'", id, action),
            ),
        );
    };

    // extraction et validation des arguments
    let args = match parse_action_args(svc, &action, &body) {
        Ok(args) => args,
        Err(err) => return soap_fault_response(&inner, err),
    };

    // invocation de la logique applicative
    match handler(args).await {
        Ok(resp_args) => {
            match build_action_response(&svc.versioned_type(), &action, &resp_args) {
                Ok(xml) => xml_response(&inner, StatusCode::OK, xml),
                Err(e) => {
                    error!("cannot render SOAP response: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Err(soap_err) => soap_fault_response(&inner, soap_err),
    }
}

/// Extrait les arguments de l'enveloppe et les valide contre les variables
/// d'état liées de l'action.
fn parse_action_args(
    svc: &Arc<Service>,
    action: &str,
    body: &[u8],
) -> Result<SoapArgs, SoapError> {
    let parsed = parse_soap_action(body).map_err(|e| {
        SoapError::new(
            UpnpErrorCode::HumanRequired,
            format!("message body for action '{}' cannot be parsed: {}", action, e),
        )
    })?;

    // l'existence de l'action a déjà été vérifiée
    let spec = svc.action_spec(action).expect("action spec must exist");

    let mut args = SoapArgs::new();
    for (name, value) in &parsed.args {
        let sv = spec.get(name).ok_or_else(|| {
            SoapError::new(
                UpnpErrorCode::InvalidArgs,
                format!(
                    "no specification for argument '{}' of action '{}' found",
                    name, action
                ),
            )
        })?;

        let typed = sv.validate_arg(value).map_err(|code| {
            SoapError::new(code, format!("arg {} is not valid: {}", name, value))
        })?;
        args.insert(name.clone(), typed);
    }

    Ok(args)
}

/// SUBSCRIBE / UNSUBSCRIBE /services/eventSub/<id>
async fn service_event_sub_handler(
    State(inner): State<Arc<ServerState>>,
    request: Request,
) -> Response {
    let method = request.method().clone();
    let headers = request.headers().clone();
    info!("event {} request received", method);

    match method.as_str() {
        "SUBSCRIBE" => {
            let sid = header_str(&headers, "SID");
            if sid.is_empty() {
                subscribe_new(&inner, &headers).await
            } else {
                subscribe_renew(&inner, &headers, sid)
            }
        }
        "UNSUBSCRIBE" => {
            let Some(sid) = parse_sid(header_str(&headers, "SID")) else {
                return precondition_failed("missing or malformed SID");
            };
            match inner.evt.remove_sub(sid) {
                Ok(()) => StatusCode::OK.into_response(),
                Err(e) => {
                    error!("unable to unsubscribe: {}", e);
                    precondition_failed("unknown SID")
                }
            }
        }
        _ => {
            error!("unknown method '{}' on event subscription URL", method);
            (
                StatusCode::METHOD_NOT_ALLOWED,
                format!("unknown method '{}'", method),
            )
                .into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

fn parse_sid(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.strip_prefix("uuid:")?).ok()
}

fn precondition_failed(msg: &str) -> Response {
    (StatusCode::PRECONDITION_FAILED, msg.to_string()).into_response()
}

fn subscription_ok(inner: &ServerState, sid: &str, timeout_secs: u64) -> Response {
    (
        StatusCode::OK,
        [
            (header::DATE, rfc1123_now()),
            (header::SERVER, inner.server_string.clone()),
            (header::HeaderName::from_static("sid"), sid.to_string()),
            (
                header::HeaderName::from_static("timeout"),
                format!("Second-{}", timeout_secs),
            ),
        ],
    )
        .into_response()
}

/// Nouvelle souscription : NT imposé, CALLBACK et TIMEOUT parsés, événement
/// initial envoyé avant de répondre.
async fn subscribe_new(inner: &Arc<ServerState>, headers: &HeaderMap) -> Response {
    if header_str(headers, "NT") != "upnp:event" {
        error!("subscription request: NT is not 'upnp:event'");
        return precondition_failed("NT is not 'upnp:event'");
    }

    let urls = match parse_callback(header_str(headers, "CALLBACK")) {
        Ok(urls) => urls,
        Err(e) => {
            error!("cannot parse callback url(s): {}", e);
            return precondition_failed("invalid callback url(s)");
        }
    };

    let duration = match parse_timeout(header_str(headers, "TIMEOUT")) {
        Ok(duration) => duration,
        Err(e) => {
            error!("could not parse timeout: {}", e);
            return precondition_failed("invalid TIMEOUT");
        }
    };

    // l'abonnement couvre toutes les variables événementielles de tous les
    // services
    let mut state_vars: Vec<Arc<StateVariable>> = Vec::new();
    for svc in inner.services.values() {
        for sv in svc.state_vars() {
            if sv.to_be_evented() {
                state_vars.push(Arc::clone(sv));
            }
        }
    }

    let sid = inner.evt.add_sub(duration, urls, state_vars).await;
    subscription_ok(inner, &format!("uuid:{}", sid), duration.as_secs())
}

/// Renouvellement : ni NT ni CALLBACK ne doivent être présents.
fn subscribe_renew(inner: &Arc<ServerState>, headers: &HeaderMap, sid: &str) -> Response {
    if !header_str(headers, "NT").is_empty() || !header_str(headers, "CALLBACK").is_empty() {
        error!("renewal: neither NT nor CALLBACK must be set");
        return (
            StatusCode::BAD_REQUEST,
            "neither NT nor CALLBACK must be set",
        )
            .into_response();
    }

    let duration = match parse_timeout(header_str(headers, "TIMEOUT")) {
        Ok(duration) => duration,
        Err(e) => {
            error!("could not parse timeout: {}", e);
            return precondition_failed("invalid TIMEOUT");
        }
    };

    let Some(parsed_sid) = parse_sid(sid) else {
        return precondition_failed("malformed SID");
    };

    match inner.evt.renew_sub(parsed_sid, duration) {
        Ok(()) => subscription_ok(inner, sid, duration.as_secs()),
        Err(e) => {
            error!("unable to accept renewal: {}", e);
            precondition_failed("unknown SID")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    use crate::config::Config;
    use crate::desc::fixtures;
    use crate::server::UpnpServer;
    use crate::variable_types::{StateValue, UpnpVarType};

    fn test_server(dir: &std::path::Path) -> UpnpServer {
        UpnpServer::new(
            Config {
                status_file: dir.join("status.json").to_string_lossy().into_owned(),
                ..Default::default()
            },
            fixtures::root_device(),
            fixtures::service_map(),
        )
        .unwrap()
    }

    fn control_request(body: &str, soap_action: &str) -> (HeaderMap, Bytes) {
        let mut headers = HeaderMap::new();
        headers.insert("SOAPACTION", soap_action.parse().unwrap());
        (headers, Bytes::from(body.to_string()))
    }

    fn set_counter_body(value: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:SetCounter xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:3">
      <Value>{}</Value>
    </u:SetCounter>
  </s:Body>
</s:Envelope>"#,
            value
        )
    }

    async fn invoke_control(server: &UpnpServer, body: &str, soap_action: &str) -> Response {
        let inner = Arc::clone(&server.inner);
        let (headers, bytes) = control_request(body, soap_action);
        service_control_handler(
            State(inner),
            Path("CD".to_string()),
            headers,
            bytes,
        )
        .await
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn test_control_dispatches_to_handler() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        server.soap_handle_fn("CD", "SetCounter", |args: SoapArgs| async move {
            let value = args.get("Value").unwrap();
            assert!(value.is_numeric());
            assert_eq!(*value, StateValue::UI4(5));
            Ok(vec![("Result".to_string(), "ok".to_string())])
        });

        let response = invoke_control(
            &server,
            &set_counter_body("5"),
            "\"urn:schemas-upnp-org:service:ContentDirectory:3#SetCounter\"",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("u:SetCounterResponse"));
        assert!(body.contains("<Result>ok</Result>"));
    }

    #[tokio::test]
    async fn test_control_out_of_range_yields_601() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        server.soap_handle_fn("CD", "SetCounter", |_args: SoapArgs| async move {
            Ok(Vec::new())
        });

        let response = invoke_control(
            &server,
            &set_counter_body("42"),
            "\"urn:schemas-upnp-org:service:ContentDirectory:3#SetCounter\"",
        )
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("<errorCode>601</errorCode>"));
    }

    #[tokio::test]
    async fn test_control_invalid_list_value_yields_600() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        server.soap_handle_fn("CD", "SetMode", |_args: SoapArgs| async move { Ok(Vec::new()) });

        let body = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:SetMode xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:3">
      <Mode>DANCING</Mode>
    </u:SetMode>
  </s:Body>
</s:Envelope>"#;
        let response = invoke_control(
            &server,
            body,
            "\"urn:schemas-upnp-org:service:ContentDirectory:3#SetMode\"",
        )
        .await;
        let body = body_string(response).await;
        assert!(body.contains("<errorCode>600</errorCode>"));
    }

    #[tokio::test]
    async fn test_control_without_handler_yields_602() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let response = invoke_control(
            &server,
            &set_counter_body("1"),
            "\"urn:schemas-upnp-org:service:ContentDirectory:3#SetCounter\"",
        )
        .await;
        let body = body_string(response).await;
        assert!(body.contains("<errorCode>602</errorCode>"));
    }

    #[tokio::test]
    async fn test_control_version_too_high_yields_400() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        server.soap_handle_fn("CD", "SetCounter", |_args: SoapArgs| async move {
            Ok(Vec::new())
        });

        let response = invoke_control(
            &server,
            &set_counter_body("1"),
            "\"urn:schemas-upnp-org:service:ContentDirectory:4#SetCounter\"",
        )
        .await;
        let body = body_string(response).await;
        assert!(body.contains("<errorCode>400</errorCode>"));
    }

    #[tokio::test]
    async fn test_control_lower_version_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        server.soap_handle_fn("CD", "SetCounter", |_args: SoapArgs| async move {
            Ok(Vec::new())
        });

        let response = invoke_control(
            &server,
            &set_counter_body("1"),
            "\"urn:schemas-upnp-org:service:ContentDirectory:1#SetCounter\"",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_control_garbage_body_yields_604() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        server.soap_handle_fn("CD", "SetCounter", |_args: SoapArgs| async move {
            Ok(Vec::new())
        });

        let response = invoke_control(
            &server,
            "this is not xml",
            "\"urn:schemas-upnp-org:service:ContentDirectory:3#SetCounter\"",
        )
        .await;
        let body = body_string(response).await;
        assert!(body.contains("<errorCode>604</errorCode>"));
    }

    #[tokio::test]
    async fn test_device_description_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let inner = Arc::clone(&server.inner);

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT_LANGUAGE, "en".parse().unwrap());
        let response = device_desc_handler(State(inner), headers).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_LANGUAGE)
                .and_then(|v| v.to_str().ok()),
            Some("en-US")
        );
        let body = body_string(response).await;
        // les URLs de services sont réécrites vers nos endpoints
        assert!(body.contains("<SCPDURL>/services/desc/CD.xml</SCPDURL>"));
        assert!(body.contains("<controlURL>/services/control/CD</controlURL>"));
    }

    #[tokio::test]
    async fn test_device_description_without_accept_language() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let inner = Arc::clone(&server.inner);

        let response = device_desc_handler(State(inner), HeaderMap::new()).await;
        assert!(response.headers().get(header::CONTENT_LANGUAGE).is_none());
    }

    #[tokio::test]
    async fn test_service_description_stamps_config_id() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let inner = Arc::clone(&server.inner);
        let config_id = inner.config_id.val();

        let response = service_desc_handler(
            State(inner),
            Path("CD.xml".to_string()),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(&format!("configId=\"{}\"", config_id)));
    }

    #[tokio::test]
    async fn test_unknown_service_description() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let response = service_desc_handler(
            State(Arc::clone(&server.inner)),
            Path("Nope.xml".to_string()),
            HeaderMap::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn subscribe_request(headers: StdHashMap<&str, &str>, method: &str) -> Request {
        let mut builder = Request::builder()
            .method(method)
            .uri("/services/eventSub/CD");
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_renew_unsubscribe() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        // nouvelle souscription
        let request = subscribe_request(
            StdHashMap::from([
                ("NT", "upnp:event"),
                ("CALLBACK", "<http://127.0.0.1:1/cb>"),
                ("TIMEOUT", "Second-1800"),
            ]),
            "SUBSCRIBE",
        );
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let sid = response
            .headers()
            .get("sid")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(sid.starts_with("uuid:"));
        assert_eq!(
            response
                .headers()
                .get("timeout")
                .and_then(|v| v.to_str().ok()),
            Some("Second-1800")
        );
        assert_eq!(server.inner.evt.sub_count(), 1);

        // renouvellement
        let request = subscribe_request(
            StdHashMap::from([("SID", sid.as_str()), ("TIMEOUT", "Second-3600")]),
            "SUBSCRIBE",
        );
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::OK);

        // un renouvellement ne doit porter ni NT ni CALLBACK
        let request = subscribe_request(
            StdHashMap::from([("SID", sid.as_str()), ("NT", "upnp:event")]),
            "SUBSCRIBE",
        );
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // résiliation
        let request =
            subscribe_request(StdHashMap::from([("SID", sid.as_str())]), "UNSUBSCRIBE");
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(server.inner.evt.sub_count(), 0);

        // SID désormais inconnu : 412
        let request = subscribe_request(
            StdHashMap::from([("SID", sid.as_str()), ("TIMEOUT", "Second-1800")]),
            "SUBSCRIBE",
        );
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_subscribe_requires_nt() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());

        let request = subscribe_request(
            StdHashMap::from([("CALLBACK", "<http://127.0.0.1:1/cb>")]),
            "SUBSCRIBE",
        );
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn test_unknown_method_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path());
        let request = subscribe_request(StdHashMap::new(), "GET");
        let response =
            service_event_sub_handler(State(Arc::clone(&server.inner)), request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
