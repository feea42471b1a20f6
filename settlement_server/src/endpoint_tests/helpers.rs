use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use serde_json::Value;
use settlement_engine::db_types::Role;

use crate::auth::{ROLE_HEADER, USER_ID_HEADER};

/// The identity the auth provider forwards with a request.
pub type Caller<'a> = Option<(&'a str, Role)>;

pub async fn get_request(
    caller: Caller<'_>,
    path: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = with_identity(TestRequest::get().uri(path), caller);
    call(req, configure).await
}

pub async fn post_request(
    caller: Caller<'_>,
    path: &str,
    body: Value,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = with_identity(TestRequest::post().uri(path).set_json(body), caller);
    call(req, configure).await
}

fn with_identity(mut req: TestRequest, caller: Caller<'_>) -> TestRequest {
    if let Some((id, role)) = caller {
        req = req.insert_header((USER_ID_HEADER, id)).insert_header((ROLE_HEADER, role.to_string()));
    }
    req
}

async fn call(req: TestRequest, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response was not JSON. {e}. {body}"))
}
