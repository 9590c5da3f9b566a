use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::{ColorMap, ColorMapRegistry};
use crate::error::CoreError;
use crate::escape::{EscapeParams, DIVERGENCE_LIMIT};
use crate::geometry::Rect;

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// Everything that determines what the renderer draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Visible region of the complex plane.
    pub rect: Rect,
    pub iteration_budget: u32,
    /// Fixed at [`DIVERGENCE_LIMIT`].
    pub divergence_limit: f64,
    /// Block size of the first, coarsest pass of a render cycle.
    pub max_block_size: u32,
    pub color_map_name: String,
}

impl ViewState {
    pub const DEFAULT_MAX_BLOCK_SIZE: u32 = 16;

    /// The whole set: `{-2, -1.5, 3, 3}`.
    pub const FULL_SET: Rect = Rect {
        x: -2.0,
        y: -1.5,
        w: 3.0,
        h: 3.0,
    };

    pub fn new(rect: Rect, iteration_budget: u32, max_block_size: u32, color_map_name: &str) -> Self {
        Self {
            rect,
            iteration_budget,
            divergence_limit: DIVERGENCE_LIMIT,
            max_block_size,
            color_map_name: color_map_name.to_string(),
        }
    }

    pub fn escape_params(&self) -> EscapeParams {
        EscapeParams {
            iteration_budget: self.iteration_budget,
            divergence_limit: self.divergence_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Event bus
// ---------------------------------------------------------------------------

/// Change notifications published by [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    RectangleChanged,
    IterationCountChanged,
    ColorMapChanged,
}

impl Topic {
    pub const ALL: [Topic; 3] = [
        Topic::RectangleChanged,
        Topic::IterationCountChanged,
        Topic::ColorMapChanged,
    ];

    fn index(self) -> usize {
        match self {
            Self::RectangleChanged => 0,
            Self::IterationCountChanged => 1,
            Self::ColorMapChanged => 2,
        }
    }
}

type Subscriber = Box<dyn FnMut(Topic, &ViewState)>;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owner of the view state for one viewer window.
///
/// State changes go through the setters only. Each setter validates, commits
/// the new value, then calls every subscriber of the matching [`Topic`]
/// synchronously in subscription order.
pub struct Session {
    state: ViewState,
    color_maps: ColorMapRegistry,
    active_map: ColorMap,
    subscribers: [Vec<Subscriber>; 3],
}

impl Session {
    pub fn new(state: ViewState, color_maps: ColorMapRegistry) -> crate::Result<Self> {
        state.rect.validate()?;
        state.escape_params().validate()?;
        if state.max_block_size < 1 {
            return Err(CoreError::InvalidBlockSize(state.max_block_size));
        }
        let active_map = match color_maps.get(&state.color_map_name) {
            Some(map) => map.clone(),
            None => return Err(CoreError::UnknownColorMap(state.color_map_name)),
        };
        Ok(Self {
            state,
            color_maps,
            active_map,
            subscribers: Default::default(),
        })
    }

    /// Full-set view, default budget and block size, built-in color maps.
    pub fn with_defaults() -> Self {
        let color_maps = ColorMapRegistry::builtin();
        let state = ViewState::new(
            ViewState::FULL_SET,
            EscapeParams::DEFAULT_ITERATION_BUDGET,
            ViewState::DEFAULT_MAX_BLOCK_SIZE,
            color_maps.default_name(),
        );
        let active_map = color_maps.default_map().clone();
        Self {
            state,
            color_maps,
            active_map,
            subscribers: Default::default(),
        }
    }

    pub fn subscribe(&mut self, topic: Topic, subscriber: impl FnMut(Topic, &ViewState) + 'static) {
        self.subscribers[topic.index()].push(Box::new(subscriber));
    }

    fn publish(&mut self, topic: Topic) {
        let subscribers = &mut self.subscribers[topic.index()];
        debug!(?topic, count = subscribers.len(), "Publishing view change");
        for subscriber in subscribers.iter_mut() {
            subscriber(topic, &self.state);
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn rect(&self) -> Rect {
        self.state.rect
    }

    pub fn iteration_budget(&self) -> u32 {
        self.state.iteration_budget
    }

    pub fn divergence_limit(&self) -> f64 {
        self.state.divergence_limit
    }

    pub fn max_block_size(&self) -> u32 {
        self.state.max_block_size
    }

    pub fn color_map_name(&self) -> &str {
        &self.state.color_map_name
    }

    pub fn color_maps(&self) -> &ColorMapRegistry {
        &self.color_maps
    }

    /// The active color map.
    pub fn color_map(&self) -> &ColorMap {
        &self.active_map
    }

    /// Replace the view rectangle. Invalid rectangles leave the view as it was.
    pub fn set_rect(&mut self, rect: Rect) -> crate::Result<()> {
        rect.validate()?;
        self.state.rect = rect;
        self.publish(Topic::RectangleChanged);
        Ok(())
    }

    pub fn set_iteration_budget(&mut self, iteration_budget: u32) -> crate::Result<()> {
        EscapeParams::new(iteration_budget)?;
        self.state.iteration_budget = iteration_budget;
        self.publish(Topic::IterationCountChanged);
        Ok(())
    }

    pub fn set_color_map(&mut self, name: &str) -> crate::Result<()> {
        let Some(map) = self.color_maps.get(name) else {
            return Err(CoreError::UnknownColorMap(name.to_string()));
        };
        self.active_map = map.clone();
        self.state.color_map_name = name.to_string();
        self.publish(Topic::ColorMapChanged);
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field(
                "subscribers",
                &self.subscribers.iter().map(Vec::len).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn log_topics(session: &mut Session) -> Rc<RefCell<Vec<Topic>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for topic in Topic::ALL {
            let log = Rc::clone(&log);
            session.subscribe(topic, move |t, _| log.borrow_mut().push(t));
        }
        log
    }

    #[test]
    fn defaults() {
        let s = Session::with_defaults();
        assert_eq!(s.rect(), ViewState::FULL_SET);
        assert_eq!(s.iteration_budget(), 100);
        assert_eq!(s.divergence_limit(), 4.0);
        assert_eq!(s.max_block_size(), 16);
        assert_eq!(s.color_map_name(), "Black and white");
    }

    #[test]
    fn setters_publish_matching_topic() {
        let mut s = Session::with_defaults();
        let log = log_topics(&mut s);

        s.set_rect(Rect::new(-1.0, -1.0, 2.0, 2.0).unwrap()).unwrap();
        s.set_iteration_budget(250).unwrap();
        s.set_color_map("Blue to green").unwrap();

        assert_eq!(
            *log.borrow(),
            [
                Topic::RectangleChanged,
                Topic::IterationCountChanged,
                Topic::ColorMapChanged
            ]
        );
        assert_eq!(s.iteration_budget(), 250);
        assert_eq!(s.color_map_name(), "Blue to green");
    }

    #[test]
    fn subscribers_run_in_order_and_see_new_state() {
        let mut s = Session::with_defaults();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for id in 0..3 {
            let seen = Rc::clone(&seen);
            s.subscribe(Topic::RectangleChanged, move |_, state| {
                seen.borrow_mut().push((id, state.rect));
            });
        }
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        s.set_rect(rect).unwrap();

        assert_eq!(*seen.borrow(), [(0, rect), (1, rect), (2, rect)]);
    }

    #[test]
    fn invalid_rect_keeps_previous_view() {
        let mut s = Session::with_defaults();
        let log = log_topics(&mut s);
        let bad = Rect {
            x: f64::NAN,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        };
        assert!(matches!(s.set_rect(bad), Err(CoreError::InvalidRect { .. })));
        assert_eq!(s.rect(), ViewState::FULL_SET);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unknown_color_map_is_rejected() {
        let mut s = Session::with_defaults();
        let log = log_topics(&mut s);
        assert_eq!(
            s.set_color_map("Rainbow"),
            Err(CoreError::UnknownColorMap("Rainbow".into()))
        );
        assert_eq!(s.color_map_name(), "Black and white");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn zero_budget_is_rejected() {
        let mut s = Session::with_defaults();
        assert!(s.set_iteration_budget(0).is_err());
        assert_eq!(s.iteration_budget(), 100);
    }

    #[test]
    fn new_validates_state() {
        let maps = ColorMapRegistry::builtin();
        let ok = ViewState::new(ViewState::FULL_SET, 50, 8, "Blue to green");
        assert!(Session::new(ok.clone(), maps.clone()).is_ok());

        let bad_block = ViewState { max_block_size: 0, ..ok.clone() };
        assert_eq!(
            Session::new(bad_block, maps.clone()).unwrap_err(),
            CoreError::InvalidBlockSize(0)
        );

        let bad_limit = ViewState {
            divergence_limit: f64::NAN,
            ..ok.clone()
        };
        assert!(matches!(
            Session::new(bad_limit, maps.clone()),
            Err(CoreError::InvalidDivergenceLimit(_))
        ));

        let bad_name = ViewState {
            color_map_name: "nope".into(),
            ..ok
        };
        assert!(Session::new(bad_name, maps).is_err());
    }

    #[test]
    fn active_color_map_follows_selection() {
        let mut s = Session::with_defaults();
        let bw = s.color_map().clone();
        s.set_color_map("Blue to green").unwrap();
        assert_ne!(s.color_map(), &bw);
        assert_eq!(Some(s.color_map()), s.color_maps().get("Blue to green"));
    }
}
