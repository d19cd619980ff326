use super::mock::{Event, MockLauncher, MockScraper, events, page, shared};
use crate::config::StreamConfig;
use crate::context::{Context, QueryParams};
use crate::error::ScrapeError;
use crate::fetcher::PaginatedFetcher;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tokio::time::Instant;

fn policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_secs(1), 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_order_of_operations() {
        let state = shared(vec![page(&["a"], false)]);
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            MockScraper::new(&state),
            &StreamConfig::default(),
        );

        let doc = fetcher.fetch(&Context::new()).await.unwrap();
        assert_eq!(doc.url(), "https://example.test/list");
        assert_eq!(
            events(&state),
            vec![
                Event::Launch,
                Event::Navigate("https://example.test/list".to_string()),
                Event::Consent,
                Event::Content,
                Event::Validate,
            ]
        );
    }

    #[tokio::test]
    async fn test_url_includes_params_in_order() {
        let state = shared(vec![page(&[], false)]);
        let mut scraper = MockScraper::new(&state);
        scraper.params = QueryParams::new().with("page", 1).with("region", "eu");
        let fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            scraper,
            &StreamConfig::default(),
        );

        assert_eq!(
            fetcher.build_url(&Context::new()),
            "https://example.test/list?page=1&region=eu"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_validation_recovers_on_third_attempt() {
        let state = shared(vec![page(&["a"], false)]);
        let scraper = MockScraper::new(&state).with_verdicts(vec![
            Err(ScrapeError::retriable("rate limited")),
            Err(ScrapeError::retriable("rate limited")),
        ]);
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            scraper,
            &StreamConfig::default(),
        )
        .with_retry_policy(policy());

        let start = Instant::now();
        let doc = fetcher.fetch(&Context::new()).await.unwrap();

        assert_eq!(doc.select_text("li").unwrap(), vec!["a"]);
        assert_eq!(doc.select_text("#attempt").unwrap(), vec!["3"]);
        assert_eq!(start.elapsed(), Duration::from_secs(1 + 2));

        let state = state.lock().unwrap();
        assert_eq!(state.navigated_at.len(), 3);
        assert_eq!(state.launches, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_timeouts_exhaust_retries() {
        let state = shared(vec![page(&["a"], false)]);
        state.lock().unwrap().navigation_timeouts = u32::MAX;
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            MockScraper::new(&state),
            &StreamConfig::default(),
        )
        .with_retry_policy(policy());

        let err = fetcher.fetch(&Context::new()).await.unwrap_err();
        match err {
            ScrapeError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 5);
                assert!(matches!(*last, ScrapeError::NavigationTimeout { .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let stamps = state.lock().unwrap().navigated_at.clone();
        assert_eq!(stamps.len(), 5);
        let gaps: Vec<_> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_validation_is_not_retried() {
        let state = shared(vec![page(&["a"], false)]);
        let scraper =
            MockScraper::new(&state).with_verdicts(vec![Err(ScrapeError::fatal("error page"))]);
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            scraper,
            &StreamConfig::default(),
        )
        .with_retry_policy(policy());

        let start = Instant::now();
        let err = fetcher.fetch(&Context::new()).await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(state.lock().unwrap().navigated_at.len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_reads_without_navigating() {
        let state = shared(vec![page(&["a"], true), page(&["b"], false)]);
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            MockScraper::new(&state),
            &StreamConfig::default(),
        );
        let ctx = Context::new();

        fetcher.fetch(&ctx).await.unwrap();
        let doc = fetcher.advance(&ctx).await.unwrap();

        assert_eq!(doc.select_text("li").unwrap(), vec!["b"]);
        assert_eq!(doc.select_text("#attempt").unwrap(), vec!["1"]);
        let navigations = events(&state)
            .into_iter()
            .filter(|e| matches!(e, Event::Navigate(_)))
            .count();
        assert_eq!(navigations, 1);
    }

    #[tokio::test]
    async fn test_refetch_reports_browser_location() {
        let state = shared(vec![page(&["a"], true), page(&["b"], false)]);
        let mut scraper = MockScraper::new(&state);
        scraper.params = QueryParams::new().with("region", "eu");
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            scraper,
            &StreamConfig::default(),
        );
        let ctx = Context::new();

        let first = fetcher.fetch(&ctx).await.unwrap();
        let second = fetcher.advance(&ctx).await.unwrap();

        assert_eq!(first.url(), "https://example.test/list?region=eu");
        assert_eq!(second.url(), "https://example.test/list?region=eu#page-2");
    }

    #[tokio::test]
    async fn test_refetch_validation_failure_propagates() {
        let state = shared(vec![page(&["a"], true), page(&["b"], false)]);
        let scraper = MockScraper::new(&state)
            .with_verdicts(vec![Ok(()), Err(ScrapeError::retriable("blocked"))]);
        let mut fetcher = PaginatedFetcher::new(
            MockLauncher {
                state: state.clone(),
            },
            scraper,
            &StreamConfig::default(),
        );
        let ctx = Context::new();

        fetcher.fetch(&ctx).await.unwrap();
        let err = fetcher.advance(&ctx).await.unwrap_err();
        assert!(err.is_retriable());
    }
}
