// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod affix;
pub mod case;
pub mod count;
pub mod join;
pub mod load;

pub use affix::PrefixSuffixAdder;
pub use case::ChangeTextCase;
pub use count::{TokenCount, TokenCounter};
pub use join::JoinText;
pub use load::LoadText;

pub(crate) use super::{DOCUMENT, STATS};
