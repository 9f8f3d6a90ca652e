use std::sync::Arc;

use rtsp_protocol::{
    Header, Method, MethodSet, Range, Request, Response, SessionHeader, Status, Transport,
    Version,
};

use crate::app::AppContext;
use crate::media::Destination;
use crate::session::session_manager::SessionShared;
use crate::session::{SessionError, SessionId};

/// Methods this server answers with something other than an error.
const SUPPORTED_METHODS: MethodSet = MethodSet::empty()
    .with(Method::Options)
    .with(Method::Setup)
    .with(Method::Play)
    .with(Method::Pause)
    .with(Method::Teardown)
    .with(Method::GetParameter)
    .with(Method::SetParameter);

pub struct AppHandler {
    context: Arc<AppContext>,
}

impl AppHandler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Answer one request from the client at `destination`.
    pub async fn handle(&self, request: &Request, destination: &Destination) -> Response {
        if request.version != Version::V1 {
            return reply_version_not_supported(request);
        }

        // Check the Require header and make sure all requested options are
        // supported or return response with 551 Option Not Supported.
        if !is_request_require_supported(request) {
            return reply_option_not_supported(request);
        }

        // A session named by the client must exist, whatever the method.
        let session = match request.session_header() {
            Some(Ok(session_header)) => {
                let session_id = SessionId::from(session_header.id());
                match self.context.session_manager.get(&session_id).await {
                    Some(session) => Some(session),
                    None => return reply_session_not_found(request),
                }
            }
            Some(Err(err)) => {
                tracing::debug!(%request, %err, "malformed session header");
                return reply_session_not_found(request);
            }
            None => None,
        };

        match request.method {
            /* Stateless */
            Method::Options => reply_to_options_with_supported_methods(request),
            Method::GetParameter | Method::SetParameter => {
                let session_header = match session {
                    Some(session) => {
                        let mut session = session.lock().await;
                        session.touch();
                        Some(session.header())
                    }
                    None => None,
                };
                if request.has_body() {
                    reply_parameter_not_understood(request)
                } else {
                    reply_to_keep_alive(request, session_header)
                }
            }
            Method::Describe
            | Method::Announce
            | Method::Record
            | Method::Get
            | Method::Post => reply_not_implemented(request),
            /* Stateful */
            Method::Setup => self.setup(request, session, destination).await,
            Method::Play => match session {
                Some(session) => self.play(request, session).await,
                None => reply_session_not_found(request),
            },
            Method::Pause => match session {
                Some(session) => self.pause(request, session).await,
                None => reply_session_not_found(request),
            },
            Method::Teardown => match session {
                Some(session) => self.teardown(request, session).await,
                None => reply_session_not_found(request),
            },
            /* Invalid */
            // Request with method REDIRECT can only be sent from server to
            // client, not the other way around.
            Method::Redirect => reply_method_not_valid(request),
        }
    }

    async fn setup(
        &self,
        request: &Request,
        session: Option<SessionShared>,
        destination: &Destination,
    ) -> Response {
        let transports = parse_transport_candidates(request);
        if transports.is_empty() {
            // If the client did not provide a single valid transport, then
            // there is no way to reach it.
            return reply_unsupported_transport(request);
        }

        let url = request.uri.to_string();
        let mounts = &self.context.mounts;
        match session {
            Some(session) => {
                let mut session = session.lock().await;
                session.touch();
                match session.setup(&url, mounts, &transports, destination.clone()) {
                    Ok(granted) => reply_to_setup(request, &granted, session.header()),
                    Err(err) => reply_session_error(request, &err),
                }
            }
            None => {
                // The session only becomes visible once setup succeeded.
                let mut session = self.context.session_manager.create();
                let granted = match session.setup(&url, mounts, &transports, destination.clone()) {
                    Ok(granted) => granted,
                    Err(err) => return reply_session_error(request, &err),
                };
                let session_header = session.header();
                match self.context.session_manager.register(session).await {
                    Ok(_) => {
                        tracing::info!(session_id = session_header.id(), %url, "session set up");
                        reply_to_setup(request, &granted, session_header)
                    }
                    // In the highly unlikely case that the randomly generated
                    // session id was already in use.
                    Err(err) => {
                        tracing::error!(%request, %err, "session id collision");
                        reply_internal_server_error(request)
                    }
                }
            }
        }
    }

    async fn play(&self, request: &Request, session: SessionShared) -> Response {
        let range = match request.range() {
            Some(Ok(range)) => Some(range),
            Some(Err(err)) => {
                tracing::debug!(%request, %err, "invalid range");
                return reply_invalid_range(request);
            }
            None => None,
        };

        let mut session = session.lock().await;
        session.touch();
        match session.play(request.path(), range.as_ref()) {
            Ok(()) => reply_to_play(
                request,
                range.unwrap_or_else(Range::new_for_live),
                session.header(),
            ),
            Err(err) => reply_session_error(request, &err),
        }
    }

    async fn pause(&self, request: &Request, session: SessionShared) -> Response {
        let mut session = session.lock().await;
        session.touch();
        match session.pause(request.path()) {
            Ok(()) => reply_with_session(request, session.header()),
            Err(err) => reply_session_error(request, &err),
        }
    }

    async fn teardown(&self, request: &Request, session: SessionShared) -> Response {
        let (session_id, is_empty) = {
            let mut session = session.lock().await;
            session.touch();
            if let Err(err) = session.teardown(request.path()) {
                return reply_session_error(request, &err);
            }
            (session.id().clone(), session.is_empty())
        };

        // The session lock is released here; emptiness is checked again
        // under the map lock.
        if is_empty
            && self
                .context
                .session_manager
                .remove_if_empty(&session_id, &session)
                .await
        {
            tracing::info!(%session_id, "session torn down");
        }
        reply_ok(request)
    }
}

#[inline]
fn is_request_require_supported(request: &Request) -> bool {
    // We don't support any features at this point
    request.require().is_empty()
}

/// Candidates that do not parse are skipped, the rest keep their order.
fn parse_transport_candidates(request: &Request) -> Vec<Transport> {
    request
        .transport_candidates()
        .filter_map(|candidate| match candidate {
            Ok(transport) => Some(transport),
            Err(err) => {
                tracing::debug!(%request, %err, "skipping transport candidate");
                None
            }
        })
        .collect()
}

#[inline]
fn reply_ok(request: &Request) -> Response {
    Response::ok().with_cseq_of(request).build()
}

#[inline]
fn reply_with_session(request: &Request, session_header: SessionHeader) -> Response {
    Response::ok()
        .with_cseq_of(request)
        .with_session(session_header)
        .build()
}

#[inline]
fn reply_to_options_with_supported_methods(request: &Request) -> Response {
    Response::ok()
        .with_cseq_of(request)
        .with_header(Header::Public, SUPPORTED_METHODS.to_string())
        .build()
}

#[inline]
fn reply_to_keep_alive(request: &Request, session_header: Option<SessionHeader>) -> Response {
    match session_header {
        Some(session_header) => reply_with_session(request, session_header),
        None => reply_ok(request),
    }
}

#[inline]
fn reply_to_setup(request: &Request, granted: &Transport, session_header: SessionHeader) -> Response {
    Response::ok()
        .with_cseq_of(request)
        .with_header(Header::Transport, granted.to_string())
        .with_session(session_header)
        .build()
}

#[inline]
fn reply_to_play(request: &Request, range: Range, session_header: SessionHeader) -> Response {
    Response::ok()
        .with_cseq_of(request)
        .with_header(Header::Range, range.to_string())
        .with_session(session_header)
        .build()
}

#[inline]
fn reply_session_error(request: &Request, err: &SessionError) -> Response {
    tracing::debug!(%request, %err, "request failed");
    Response::error(err.status()).with_cseq_of(request).build()
}

#[inline]
fn reply_version_not_supported(request: &Request) -> Response {
    tracing::debug!(%request, version = %request.version, "unsupported version");
    Response::error(Status::RtspVersionNotSupported)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_option_not_supported(request: &Request) -> Response {
    tracing::debug!(%request, "client asked for feature that is not supported");
    Response::error(Status::OptionNotSupported)
        .with_cseq_of(request)
        .with_header(Header::Unsupported, request.require().join(", "))
        .build()
}

#[inline]
fn reply_session_not_found(request: &Request) -> Response {
    tracing::debug!(%request, session = request.session(), "session not found");
    Response::error(Status::SessionNotFound)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_not_implemented(request: &Request) -> Response {
    tracing::warn!(%request, method = %request.method, "client sent unsupported request");
    Response::error(Status::NotImplemented)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_method_not_valid(request: &Request) -> Response {
    tracing::warn!(
        %request,
        method = %request.method,
        "client tried server-only method in request to server; \
        does client think it is server?",
    );
    Response::error(Status::MethodNotValidInThisState)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_parameter_not_understood(request: &Request) -> Response {
    tracing::debug!(%request, "parameters not supported");
    Response::error(Status::ParameterNotUnderstood)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_unsupported_transport(request: &Request) -> Response {
    tracing::debug!(%request, "unsupported transport");
    Response::error(Status::UnsupportedTransport)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_invalid_range(request: &Request) -> Response {
    Response::error(Status::InvalidRange)
        .with_cseq_of(request)
        .build()
}

#[inline]
fn reply_internal_server_error(request: &Request) -> Response {
    Response::error(Status::InternalServerError)
        .with_cseq_of(request)
        .build()
}
