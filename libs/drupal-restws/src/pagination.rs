//! Lazy, bidirectional traversal over a paginated `restws` collection.
//!
//! Pages are kept in an arena owned by the [`EntityListing`]; each page holds
//! optional indices of its neighbours, filled in the first time the listing
//! moves across that edge. Moving over a known edge never refetches.

use serde_json::Value;

use crate::api::{Filters, RestWsApi};
use crate::error::RestWsError;

pub const PAGE_FILTER: &str = "page";

#[derive(Debug, Clone)]
pub struct EntityPage {
    number: u32,
    records: Vec<Value>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl EntityPage {
    fn new(number: u32, records: Vec<Value>) -> Self {
        Self {
            number,
            records,
            prev: None,
            next: None,
        }
    }

    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    #[must_use]
    pub fn records(&self) -> &[Value] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

pub struct EntityListing<'a, A: ?Sized> {
    api: &'a A,
    entity_type: String,
    filters: Filters,
    max_page: u32,
    pages: Vec<EntityPage>,
    current: usize,
}

impl<A: ?Sized> std::fmt::Debug for EntityListing<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityListing")
            .field("entity_type", &self.entity_type)
            .field("filters", &self.filters)
            .field("max_page", &self.max_page)
            .field("pages", &self.pages.len())
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<'a, A: RestWsApi + ?Sized> EntityListing<'a, A> {
    /// Fetches the initial page. The max page number is read from this
    /// response only.
    ///
    /// # Errors
    /// Propagates the backend failure of the initial page fetch.
    pub async fn open(api: &'a A, entity_type: &str, mut filters: Filters) -> Result<Self, RestWsError> {
        let number = filters
            .get(PAGE_FILTER)
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(0);
        filters.insert(PAGE_FILTER.to_owned(), number.to_string());

        let payload = api.fetch_page(entity_type, &filters).await?;
        let max_page = payload.last_page.unwrap_or(number).max(number);

        Ok(Self {
            api,
            entity_type: entity_type.to_owned(),
            filters,
            max_page,
            pages: vec![EntityPage::new(number, payload.records)],
            current: 0,
        })
    }

    #[must_use]
    pub fn current(&self) -> &EntityPage {
        &self.pages[self.current]
    }

    #[must_use]
    pub fn max_page(&self) -> u32 {
        self.max_page
    }

    /// Pages fetched so far, including released ones.
    #[must_use]
    pub fn fetched_pages(&self) -> usize {
        self.pages.len()
    }

    /// Moves the current page's records out, leaving it empty.
    pub fn take_current_records(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.pages[self.current].records)
    }

    /// Moves to the following page, fetching it on first traversal.
    ///
    /// A forgetful move leaves no link from the new page back to this one, and
    /// releases this page's records once nothing links to it. Returns `None`
    /// past the last page.
    ///
    /// # Errors
    /// Propagates the backend failure of the page fetch.
    pub async fn next_page(&mut self, forgetful: bool) -> Result<Option<&EntityPage>, RestWsError> {
        self.step(Direction::Forward, forgetful).await
    }

    /// Moves to the preceding page; see [`next_page`](Self::next_page).
    ///
    /// # Errors
    /// Propagates the backend failure of the page fetch.
    pub async fn prev_page(&mut self, forgetful: bool) -> Result<Option<&EntityPage>, RestWsError> {
        self.step(Direction::Backward, forgetful).await
    }

    async fn step(
        &mut self,
        direction: Direction,
        forgetful: bool,
    ) -> Result<Option<&EntityPage>, RestWsError> {
        let here = self.current;
        let page = &self.pages[here];

        let linked = match direction {
            Direction::Forward => page.next,
            Direction::Backward => page.prev,
        };

        let target = if let Some(idx) = linked {
            idx
        } else {
            let number = match direction {
                Direction::Forward if page.number < self.max_page => page.number + 1,
                Direction::Backward if page.number > 0 => page.number - 1,
                Direction::Forward | Direction::Backward => return Ok(None),
            };
            self.fetch_neighbour(here, number, direction, forgetful).await?
        };

        if forgetful {
            self.forget(here, target, direction);
        }
        self.current = target;
        Ok(Some(&self.pages[target]))
    }

    /// Cuts the link from `target` back to `here`, then releases `here`'s
    /// records once no page links to it any more.
    fn forget(&mut self, here: usize, target: usize, direction: Direction) {
        let back = match direction {
            Direction::Forward => &mut self.pages[target].prev,
            Direction::Backward => &mut self.pages[target].next,
        };
        if *back == Some(here) {
            *back = None;
        }

        let reachable = self
            .pages
            .iter()
            .any(|p| p.prev == Some(here) || p.next == Some(here));
        if !reachable {
            self.pages[here].records = Vec::new();
        }
    }

    async fn fetch_neighbour(
        &mut self,
        here: usize,
        number: u32,
        direction: Direction,
        forgetful: bool,
    ) -> Result<usize, RestWsError> {
        let mut filters = self.filters.clone();
        filters.insert(PAGE_FILTER.to_owned(), number.to_string());

        tracing::debug!(entity_type = %self.entity_type, page = number, "fetching page");
        let payload = self.api.fetch_page(&self.entity_type, &filters).await?;

        let idx = self.pages.len();
        let mut page = EntityPage::new(number, payload.records);
        match direction {
            Direction::Forward => {
                self.pages[here].next = Some(idx);
                if !forgetful {
                    page.prev = Some(here);
                }
            }
            Direction::Backward => {
                self.pages[here].prev = Some(idx);
                if !forgetful {
                    page.next = Some(here);
                }
            }
        }
        self.pages.push(page);
        Ok(idx)
    }
}

/// Extracts the `page` query parameter from a `restws` paging link.
#[must_use]
pub fn page_number_from_link(link: &str) -> Option<u32> {
    let url = url::Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == PAGE_FILTER)
        .and_then(|(_, v)| v.parse().ok())
}
