use std::{
    collections::BTreeMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocates an id that is never handed out again in this process.
            pub fn next() -> Self {
                static NEXT: AtomicU64 = AtomicU64::new(1);
                Self(NEXT.fetch_add(1, Ordering::Relaxed))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

id_newtype!(OwnerId);
id_newtype!(ScopeId);
id_newtype!(TaskId);
id_newtype!(SubscriptionId);

pub const RESULT_OK: i32 = -1;
pub const RESULT_CANCELED: i32 = 0;

/// Extra values handed to a screen, keyed by argument name.
pub type ScreenArgs = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route(pub String);

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRequest {
    pub route: Route,
    pub args: Option<ScreenArgs>,
}

impl ScreenRequest {
    pub fn new(route: Route) -> Self {
        Self { route, args: None }
    }

    pub fn with_args(route: Route, args: ScreenArgs) -> Self {
        Self {
            route,
            args: Some(args),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishRequest {
    pub result_code: Option<i32>,
    pub data: Option<ScreenArgs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub code: i32,
    pub data: Option<ScreenArgs>,
}

impl ScreenResult {
    pub fn ok(data: Option<ScreenArgs>) -> Self {
        Self {
            code: RESULT_OK,
            data,
        }
    }

    pub fn canceled() -> Self {
        Self {
            code: RESULT_CANCELED,
            data: None,
        }
    }
}
