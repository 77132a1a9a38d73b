/*!
# ThinkFast

A small autocorrect web service that fixes a handful of common typos and keeps
simple usage statistics.

## Overview

Users type text into a browser page. The server replaces known misspellings
using a fixed, ordered table of literal substitutions, then records which
tracked misspellings the text contained together with a placeholder typing
speed sample. An insights page and JSON endpoint summarise the history.

## Architecture

### Core
- **Corrector** - Applies the rule table to text, and reports which
  misspellings a text contains regardless of case
- **Stats Store** - A single JSON document holding per-token counts and a
  typing speed history, rewritten in full on every correction under a lock

### Web Layer (`web` feature)
- **Router** - axum routes for the pages and the JSON API, with permissive CORS
- **Pages** - Handlebars templates for the editor and insights views
- **Config** - Command line and environment settings

## Persistence

The stats document looks like:

```text
{"misspelled": {"teh": 3}, "typing_speed": [{"date": "2024-05-01", "wpm": 1.5}]}
```

It is created empty on startup when missing. Updates are written to a
temporary file and renamed into place.

## Example

```
use thinkfast::Corrector;

let corrector = Corrector::default();
assert_eq!(corrector.correct("taht is adn thsi"), "that is and this");
assert_eq!(corrector.detect("TEH"), vec!["teh"]);
```

## REST API Endpoints

- `POST /api/correct` - Corrects `{"text": ...}` and records statistics
- `GET /api/insights` - Top five misspellings and the last seven speed samples
- `GET /` - Editor page
- `GET /insights` - Insights page
- `/static/<path>` - Static assets
*/

pub mod corrector;
pub mod error;
pub mod stats;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod config;
#[cfg(feature = "web")]
pub mod templates;

pub use corrector::{CorrectionRule, Corrector, RuleTable};
pub use error::{Error, Result};
pub use stats::{Insights, SpeedSample, StatsDocument, StatsStore};
