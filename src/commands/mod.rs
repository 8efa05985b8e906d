// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod auth;
pub mod basket;
pub mod campaigns;
pub mod checkout;
pub mod doctor;
pub mod exporter;
pub mod prices;
pub mod settings;
pub mod zakat;
