//! Secret-bearing newtypes
//!
//! Every value that would compromise the OAuth flow if leaked is wrapped in
//! a newtype whose `Debug` output is redacted and whose memory is wiped on
//! drop. The inner value is only reachable through an explicit `secret()`
//! call so that accidental formatting into logs or errors cannot happen.

use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

macro_rules! secret_type {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Zeroize, ZeroizeOnDrop)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` wrapping the given string.")]
            pub fn new(s: impl Into<String>) -> Self {
                $name(s.into())
            }

            #[doc = concat!("Get the secret contained within this `", stringify!($name), "`.")]
            ///
            /// # Security Warning
            ///
            /// Leaking this value may compromise the security of the OAuth2 flow.
            pub fn secret(&self) -> &str {
                &self.0
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "([redacted])"))
            }
        }
    };
}

secret_type! {
    /// Access token issued by the authorization server.
    #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    AccessToken
}

secret_type! {
    /// Refresh token issued alongside an access token.
    #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    RefreshToken
}

secret_type! {
    /// Confidential client secret of a web application.
    ClientSecret
}

secret_type! {
    /// PEM-encoded private key used to sign JWT bearer assertions.
    PrivateKeyPem
}

secret_type! {
    /// Device code returned by the device authorization endpoint.
    ///
    /// Unlike the user code, the device code is never shown to the user.
    #[derive(Deserialize)]
    #[serde(transparent)]
    DeviceCode
}

secret_type! {
    /// Authorization code received on the redirect callback.
    AuthorizationCode
}

secret_type! {
    /// Signed JWT bearer assertion in compact serialization.
    SignedAssertion
}
