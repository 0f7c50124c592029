//! Page controllers: the post listing and the post reader
//!
//! Each controller fetches from a [`ContentSource`](crate::source::ContentSource),
//! shapes the documents into a view and renders it with the embedded templates.

pub mod detail;
pub mod listing;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tera::Context;

use crate::config::SiteConfig;
use crate::helpers::{date_xml, short_date};
use crate::i18n::I18n;

/// Site-wide values every page needs
#[derive(Debug, Clone)]
pub struct PageContext {
    title: String,
    language: String,
    tz: chrono_tz::Tz,
    months: Vec<String>,
    i18n: I18n,
}

/// Strings handed to templates, resolved for the site language
#[derive(Debug, Clone, Serialize)]
struct Strings {
    home: String,
    load_more: String,
    load_error: String,
    loading: String,
    not_found: String,
    server_error: String,
}

/// A date as rendered in a page: display text plus machine-readable value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateView {
    pub display: String,
    pub iso: String,
}

impl PageContext {
    pub fn new(config: &SiteConfig, i18n: I18n) -> Self {
        Self {
            title: config.title.clone(),
            language: config.language.clone(),
            tz: config.tz(),
            months: i18n.months_short(),
            i18n,
        }
    }

    /// Publication date as shown on cards and posts, e.g. `12 set 2021`
    pub fn format_date(&self, date: Option<&DateTime<FixedOffset>>) -> Option<DateView> {
        date.map(|d| DateView {
            display: short_date(d, self.tz, &self.months),
            iso: date_xml(d),
        })
    }

    pub fn i18n(&self) -> &I18n {
        &self.i18n
    }

    /// Template context with site title, language and UI strings
    pub(crate) fn base_context(&self) -> Context {
        let strings = Strings {
            home: self.i18n.get("home"),
            load_more: self.i18n.get("listing.load_more"),
            load_error: self.i18n.get("listing.error"),
            loading: self.i18n.get("post.loading"),
            not_found: self.i18n.get("post.not_found"),
            server_error: self.i18n.get("post.server_error"),
        };

        let mut context = Context::new();
        context.insert("site_title", &self.title);
        context.insert("language", &self.language);
        context.insert("strings", &strings);
        context
    }

    pub(crate) fn months(&self) -> &[String] {
        &self.months
    }
}
