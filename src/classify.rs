//! Maps raw provider signals onto [`ErrorKind`]
//!
//! Provider clients never decide an error kind themselves; they
//! describe what happened as a [`Signal`] and ask [`classify`].

use crate::error::ErrorKind;

/// Case-insensitive substrings that mark an error payload as a
/// quota or rate-limit rejection.
pub const QUOTA_VOCABULARY: [&str; 4] = [
  "quota"
, "rate limit"
, "rate_limit"
, "resource_exhausted"
];

/// Error object decoded from a provider response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPayload<'a>
{   /// `error.code`, stringified (numeric or symbolic)
    pub code: Option<&'a str>
  , /// `error.status`, when the vendor sends one
    pub status: Option<&'a str>
  , pub message: &'a str
}

impl ErrorPayload<'_>
{   fn indicates_quota(&self) -> bool
    {   if self.code == Some("429")
        {   return true;
        }
        [Some(self.message), self.code, self.status]
          .into_iter()
          .flatten()
          .any(mentions_quota)
    }
}

/// How the response body decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body<'a>
{   /// Not valid JSON
    Undecodable
  , /// JSON carrying an `error` object
    Error(ErrorPayload<'a>)
  , /// JSON without an `error` object
    Decoded
}

/// What a provider call observed before it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<'a>
{   /// No key configured; nothing was sent
    MissingCredentials
  , /// Connect, DNS, timeout or body read failure
    Transport
  , /// An HTTP response arrived
    Response
    {   status: u16
      , body: Body<'a>
    }
}

/// First matching rule wins.
pub fn classify(signal: &Signal<'_>) -> ErrorKind
{   let (status, body) = match *signal
    {   Signal::MissingCredentials => return ErrorKind::NoCredentials
      , Signal::Transport => return ErrorKind::Transient
      , Signal::Response { status, body } => (status, body)
    };

    if status == 429 || status == 503
    {   return ErrorKind::QuotaExceeded;
    }
    if let Body::Error(payload) = body
    {   if payload.indicates_quota()
        {   return ErrorKind::QuotaExceeded;
        }
    }
    if (500..600).contains(&status)
    {   return ErrorKind::Transient;
    }
    match body
    {   Body::Error(_) => ErrorKind::Permanent
      , Body::Undecodable => ErrorKind::Malformed
      , Body::Decoded => ErrorKind::Permanent
    }
}

pub fn mentions_quota(text: &str) -> bool
{   let lower = text.to_lowercase();
    QUOTA_VOCABULARY.iter().any(|word| lower.contains(word))
}

#[cfg(test)]
mod tests
{   use super::*;

    fn error_body(message: &str) -> Body<'_>
    {   Body::Error(ErrorPayload
        {   code: None
          , status: None
          , message
        })
    }

    #[test]
    fn missing_credentials_is_no_credentials()
    {   assert_eq!(
          classify(&Signal::MissingCredentials),
          ErrorKind::NoCredentials
        );
    }

    #[test]
    fn transport_failure_is_transient()
    {   assert_eq!(classify(&Signal::Transport), ErrorKind::Transient);
    }

    #[test]
    fn status_429_and_503_are_quota_regardless_of_body()
    {   for status in [429, 503]
        {   for body in [Body::Undecodable, Body::Decoded, error_body("x")]
            {   assert_eq!(
                  classify(&Signal::Response { status, body }),
                  ErrorKind::QuotaExceeded
                );
            }
        }
    }

    #[test]
    fn quota_vocabulary_in_message_is_case_insensitive()
    {   let signal = Signal::Response
        {   status: 400
          , body: error_body("You exceeded your current QUOTA")
        };
        assert_eq!(classify(&signal), ErrorKind::QuotaExceeded);

        let signal = Signal::Response
        {   status: 400
          , body: error_body("Rate Limit reached for model")
        };
        assert_eq!(classify(&signal), ErrorKind::QuotaExceeded);
    }

    #[test]
    fn symbolic_and_numeric_codes_mark_quota()
    {   let symbolic = Body::Error(ErrorPayload
        {   code: Some("rate_limit_exceeded")
          , status: None
          , message: "slow down"
        });
        assert_eq!(
          classify(&Signal::Response { status: 200, body: symbolic }),
          ErrorKind::QuotaExceeded
        );

        let numeric = Body::Error(ErrorPayload
        {   code: Some("429")
          , status: None
          , message: "try later"
        });
        assert_eq!(
          classify(&Signal::Response { status: 200, body: numeric }),
          ErrorKind::QuotaExceeded
        );
    }

    #[test]
    fn other_5xx_is_transient()
    {   for status in [500, 502, 504]
        {   let signal = Signal::Response
            {   status
              , body: error_body("internal")
            };
            assert_eq!(classify(&signal), ErrorKind::Transient);
        }
    }

    #[test]
    fn other_error_payload_is_permanent()
    {   let signal = Signal::Response
        {   status: 400
          , body: error_body("API key not valid")
        };
        assert_eq!(classify(&signal), ErrorKind::Permanent);
    }

    #[test]
    fn undecodable_body_is_malformed()
    {   let signal = Signal::Response
        {   status: 200
          , body: Body::Undecodable
        };
        assert_eq!(classify(&signal), ErrorKind::Malformed);
    }

    #[test]
    fn decoded_body_on_failed_status_is_permanent()
    {   let signal = Signal::Response
        {   status: 404
          , body: Body::Decoded
        };
        assert_eq!(classify(&signal), ErrorKind::Permanent);
    }
}
