// Copyright (c) 2022 MASSA LABS <info@massa.net>

use ixian_models::Transaction;

/// Subscription channels fed by the pool
#[derive(Clone)]
pub struct PoolChannels {
    /// transactions accepted into the pool while the node is not synchronizing
    pub transaction_sender: tokio::sync::broadcast::Sender<Transaction>,
    /// transactions stamped as applied by a committed block
    pub applied_sender: tokio::sync::broadcast::Sender<Transaction>,
}
