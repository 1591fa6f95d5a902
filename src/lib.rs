/*!
# Data Sweeper & Post Board

Two small browser applications served by one Rust process.

## Overview

**Data Sweeper** takes CSV and Excel uploads, previews them, and offers
built-in cleaning, column selection, a chart of the numeric columns and
conversion between CSV and XLSX. **Post Board** is a toy social board where
visitors create posts, like them and leave comments.

## Architecture

### Frontend Layer
- **Technologies**: HTML, CSS, JavaScript pages embedded in the binary
- Pages talk to the backend through the JSON API below

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Loader - Parses uploads by extension, one outcome per file
  - Table - Rows and named columns with per-column type inference
  - Cleaning - Duplicate removal and numeric mean-fill
  - Downloader - CSV / XLSX encoding with derived file names and MIME types
  - Graph - Bar chart of numeric columns rendered to PNG
  - Posts - Flat JSON store, rewritten atomically on every change

### Data Persistence Layer
- Uploaded datasets live in memory for the lifetime of the process
- Posts live in a single JSON file holding an array of post objects
- Post images are stored in an uploads directory

## Modules

- **table**: Values, column types and projection
- **loader**: CSV / spreadsheet ingest
- **cleaning**: Duplicate removal and mean-fill
- **downloader**: Export functionality (CSV, XLSX)
- **graph**: Chart generation
- **posts**: Post store
- **uploads**: Post image storage
- **config**: Server settings
- **app**: Routing and handlers

## REST API Endpoints

- `POST /api/sweeper/upload` - Upload one or more CSV / Excel files
- `GET|DELETE /api/sweeper/{id}` - Inspect or discard an upload
- `POST /api/sweeper/{id}/clean` - Remove duplicates, fill missing values
- `GET /api/sweeper/{id}/chart` - PNG chart of numeric columns
- `GET /api/sweeper/{id}/export` - Download as CSV or XLSX
- `GET|POST /api/posts` - List or create posts
- `POST /api/posts/{id}/like`, `POST /api/posts/{id}/comments` - Interact with a post
*/

pub mod app;
pub mod cleaning;
pub mod config;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod posts;
pub mod table;
pub mod uploads;

pub use error::{Result, SweeperError};
