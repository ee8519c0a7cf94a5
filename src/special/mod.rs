// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Special-packet fuzzers: Version Negotiation and Retry (spec.md §4.4).

pub mod retry;
pub mod version_negotiation;
