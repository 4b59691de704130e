// Relic - Solidity Recompiler
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Acquisition and invocation of Solidity compilers.

pub mod cache;
pub mod compiler;
pub mod fallback;
pub mod fetcher;
pub mod process;
pub mod version;

pub use cache::*;
pub use compiler::*;
pub use fallback::*;
pub use fetcher::*;
pub use process::*;
pub use version::*;
