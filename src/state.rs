// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::clients::ClientFactory;
use crate::config::GatewayConfig;
use crate::lifecycle::Lifecycle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub clients: Arc<ClientFactory>,
    pub lifecycle: Arc<Lifecycle>,
}

impl AppState {
    pub fn new(
        config: Arc<GatewayConfig>,
        clients: ClientFactory,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            config,
            clients: Arc::new(clients),
            lifecycle,
        }
    }
}
