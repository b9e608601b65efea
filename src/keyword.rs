// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Framing keywords recognized by the tokenizing reader and used by the
//! emitter. These are the handful of names that carry syntactic meaning
//! (component framing, version switching, encoding/charset signaling)
//! rather than being ordinary property names.

pub const KW_BEGIN: &str = "BEGIN";
pub const KW_END: &str = "END";
pub const KW_VERSION: &str = "VERSION";

pub const KW_ENCODING: &str = "ENCODING";
pub const KW_CHARSET: &str = "CHARSET";
pub const KW_VALUE_QUOTED_PRINTABLE: &str = "QUOTED-PRINTABLE";
