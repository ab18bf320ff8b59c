use std::cell::{Cell, RefCell};
use std::rc::Rc;

use eframe::egui::Color32;
use thiserror::Error;

use super::axis::{AxesConfig, Domain};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface has been released")]
    Released,
    #[error("surface not anchored")]
    NotAnchored,
    #[error("could not create surface: {0}")]
    Create(String),
}

// ---------------------------------------------------------------------------
// Marks
// ---------------------------------------------------------------------------

/// Which rendition of a series a mark draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    /// Raw data, drawn normally when smoothing is off.
    Raw,
    /// Raw data drawn faintly behind the smoothed line.
    Ghost,
    Smoothed,
}

/// One polyline of a series, in data coordinates (x, y before any y scale).
/// Absent points (NaN y) split the line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMark {
    pub kind: MarkKind,
    pub color: Color32,
    pub points: Vec<[f64; 2]>,
}

// ---------------------------------------------------------------------------
// Surface seam
// ---------------------------------------------------------------------------

/// Drawing surface a line chart renders onto.
pub trait ChartSurface {
    /// Attach axes; a chart renders only after anchoring succeeds.
    fn anchor(&mut self, axes: &AxesConfig) -> Result<(), SurfaceError>;
    fn set_domain(&mut self, x: Domain, y: Domain) -> Result<(), SurfaceError>;
    /// Replace every mark of `series` with `marks`.
    fn draw_series(&mut self, series: &str, label: &str, marks: Vec<LineMark>)
        -> Result<(), SurfaceError>;
    fn remove_series(&mut self, series: &str);
    /// Drop all marks, keeping the axes.
    fn clear(&mut self);
    /// Free the surface; it cannot be used afterwards.
    fn release(&mut self);
}

/// Creates one fresh surface per chart instance.
pub trait SurfaceProvider {
    fn create_surface(&mut self) -> Result<Box<dyn ChartSurface>, SurfaceError>;
}

// ---------------------------------------------------------------------------
// Scene surface: marks kept in memory for the egui plot
// ---------------------------------------------------------------------------

/// Everything one chart instance has drawn.
#[derive(Debug, Default)]
pub struct PlotScene {
    pub axes: Option<AxesConfig>,
    pub x_domain: Option<Domain>,
    pub y_domain: Option<Domain>,
    /// Series in draw order: (name, legend label, marks).
    pub series: Vec<(String, String, Vec<LineMark>)>,
    /// Number of `draw_series` calls received.
    pub draw_count: usize,
    pub released: bool,
}

pub type SharedScene = Rc<RefCell<PlotScene>>;

struct SceneSurface {
    scene: SharedScene,
    live: Rc<Cell<usize>>,
}

impl SceneSurface {
    fn check(&self) -> Result<(), SurfaceError> {
        let scene = self.scene.borrow();
        if scene.released {
            Err(SurfaceError::Released)
        } else if scene.axes.is_none() {
            Err(SurfaceError::NotAnchored)
        } else {
            Ok(())
        }
    }
}

impl ChartSurface for SceneSurface {
    fn anchor(&mut self, axes: &AxesConfig) -> Result<(), SurfaceError> {
        let mut scene = self.scene.borrow_mut();
        if scene.released {
            return Err(SurfaceError::Released);
        }
        scene.axes = Some(*axes);
        Ok(())
    }

    fn set_domain(&mut self, x: Domain, y: Domain) -> Result<(), SurfaceError> {
        self.check()?;
        let mut scene = self.scene.borrow_mut();
        scene.x_domain = Some(x);
        scene.y_domain = Some(y);
        Ok(())
    }

    fn draw_series(
        &mut self,
        series: &str,
        label: &str,
        marks: Vec<LineMark>,
    ) -> Result<(), SurfaceError> {
        self.check()?;
        let mut scene = self.scene.borrow_mut();
        scene.draw_count += 1;
        match scene.series.iter_mut().find(|(name, _, _)| name == series) {
            Some(entry) => {
                entry.1 = label.to_string();
                entry.2 = marks;
            }
            None => scene
                .series
                .push((series.to_string(), label.to_string(), marks)),
        }
        Ok(())
    }

    fn remove_series(&mut self, series: &str) {
        self.scene
            .borrow_mut()
            .series
            .retain(|(name, _, _)| name != series);
    }

    fn clear(&mut self) {
        self.scene.borrow_mut().series.clear();
    }

    fn release(&mut self) {
        let mut scene = self.scene.borrow_mut();
        if scene.released {
            return;
        }
        scene.released = true;
        scene.series.clear();
        self.live.set(self.live.get().saturating_sub(1));
    }
}

impl Drop for SceneSurface {
    fn drop(&mut self) {
        self.release();
    }
}

/// Hands out in-memory scenes and remembers the live ones for the UI.
///
/// Cloning shares state, so the UI keeps one handle and the chart host
/// another.
#[derive(Clone, Default)]
pub struct SceneProvider {
    scenes: Rc<RefCell<Vec<SharedScene>>>,
    live: Rc<Cell<usize>>,
}

impl SceneProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently created scene that has not been released. A
    /// surface freed after a failed build falls back to the one before it.
    pub fn current(&self) -> Option<SharedScene> {
        self.scenes
            .borrow()
            .iter()
            .rev()
            .find(|scene| !scene.borrow().released)
            .cloned()
    }

    /// Surfaces created and not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.live.get()
    }
}

impl SurfaceProvider for SceneProvider {
    fn create_surface(&mut self) -> Result<Box<dyn ChartSurface>, SurfaceError> {
        let scene: SharedScene = Rc::default();
        let mut scenes = self.scenes.borrow_mut();
        scenes.retain(|s| !s.borrow().released);
        scenes.push(Rc::clone(&scene));
        self.live.set(self.live.get() + 1);
        Ok(Box::new(SceneSurface {
            scene,
            live: Rc::clone(&self.live),
        }))
    }
}
