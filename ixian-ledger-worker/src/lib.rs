// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! In-memory wallet state.
#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod wallet_state;

pub use wallet_state::WalletState;
