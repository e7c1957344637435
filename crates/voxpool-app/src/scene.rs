//! Scripted scene exercising every manager feature on a silent backend.

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use voxpool_core::{ClipDescriptor, ClipVariants, OnComplete, PlayOverrides, PlayParams};
use voxpool_engine::{AudioManager, ChannelHandle, EngineEvent, SilentBackend};

/// Length of every one-shot clip in the scene, in seconds.
const ONE_SHOT_LENGTH: f64 = 0.4;
const FOOTSTEP_INTERVAL: f64 = 0.35;
const FOOTSTEP_COUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    StartMusic,
    StartAmbience,
    Footstep,
    Click,
    CrossfadeMusic,
    Duck,
    Unduck,
    FadeOut,
}

#[derive(Debug, Clone, Copy)]
struct Cue {
    at: f64,
    action: Action,
}

/// One-shot voice the silent backend should report finished at `due`.
struct PendingFinish {
    due: f64,
    group: &'static str,
    handle: ChannelHandle,
}

/// Timeline of cues driven from the tick loop.
pub struct Scene {
    cues: Vec<Cue>,
    next: usize,
    end: f64,
    footsteps: ClipVariants,
    pending: Vec<PendingFinish>,
}

impl Scene {
    pub fn new() -> Self {
        let mut cues = vec![
            Cue {
                at: 0.0,
                action: Action::StartMusic,
            },
            Cue {
                at: 0.0,
                action: Action::StartAmbience,
            },
            Cue {
                at: 1.0,
                action: Action::Click,
            },
            Cue {
                at: 2.0,
                action: Action::CrossfadeMusic,
            },
            Cue {
                at: 2.5,
                action: Action::Click,
            },
            Cue {
                at: 3.0,
                action: Action::Duck,
            },
            Cue {
                at: 4.0,
                action: Action::Unduck,
            },
            Cue {
                at: 4.5,
                action: Action::FadeOut,
            },
        ];
        cues.extend((0..FOOTSTEP_COUNT).map(|step| Cue {
            at: f64::from(step).mul_add(FOOTSTEP_INTERVAL, 0.5),
            action: Action::Footstep,
        }));
        cues.sort_by(|a, b| a.at.total_cmp(&b.at));

        let footsteps = ["step_grass_1", "step_grass_2", "step_grass_3", "step_grass_4"]
            .into_iter()
            .map(|clip| ClipDescriptor::new(clip).in_group("fx").with_volume(0.7))
            .collect();

        Self {
            cues,
            next: 0,
            end: 6.0,
            footsteps,
            pending: Vec::new(),
        }
    }

    /// Whether every cue has fired and the tail has played out.
    pub fn is_finished(&self, elapsed: f64) -> bool {
        self.next >= self.cues.len() && elapsed >= self.end
    }

    /// Fire every cue due at `elapsed` seconds into the scene.
    pub fn advance(
        &mut self,
        manager: &mut AudioManager,
        backend: &SilentBackend,
        elapsed: f64,
    ) -> Result<()> {
        self.finish_due(manager, backend, elapsed);

        while let Some(cue) = self.cues.get(self.next).copied() {
            if cue.at > elapsed {
                break;
            }
            self.next += 1;
            debug!("Cue {:?} at {:.2}s", cue.action, elapsed);
            self.fire(manager, cue.action, elapsed)
                .with_context(|| format!("Cue {:?} failed", cue.action))?;
        }
        Ok(())
    }

    fn fire(&mut self, manager: &mut AudioManager, action: Action, elapsed: f64) -> Result<()> {
        match action {
            Action::StartMusic => {
                manager.play("music", "theme_day", PlayParams::new().looping(true))?;
            }
            Action::StartAmbience => {
                manager.play("ambient", "wind", PlayParams::new().looping(true))?;
                manager.play("ambient", "birds", PlayParams::new().volume(0.6).looping(true))?;
            }
            Action::Footstep => {
                let pitch = PlayOverrides {
                    pitch: Some(0.05f32.mul_add((self.next % 3) as f32, 0.95)),
                    ..PlayOverrides::default()
                };
                if let Some(handle) = manager.play_variant(&mut self.footsteps, pitch)? {
                    self.expect_finish("fx", handle, elapsed);
                }
            }
            Action::Click => {
                if let Some(handle) = manager.play("ui", "click", PlayParams::new())? {
                    self.expect_finish("ui", handle, elapsed);
                }
            }
            Action::CrossfadeMusic => {
                let spec = manager.fade_spec(1.5);
                let handle = manager.crossfade(
                    "music",
                    "theme_night",
                    PlayParams::new().looping(true),
                    spec,
                )?;
                if handle.is_none() {
                    warn!("Music crossfade refused");
                }
            }
            Action::Duck => {
                let spec = manager.fade_spec(0.5);
                manager.group_mut("ambient")?.fade_to(0.3, spec);
            }
            Action::Unduck => {
                let spec = manager.fade_spec(0.5);
                manager.group_mut("ambient")?.fade_to(1.0, spec);
            }
            Action::FadeOut => {
                let spec = manager.fade_spec(1.0).on_complete(OnComplete::Stop);
                manager.fade_global(0.0, spec)?;
            }
        }
        Ok(())
    }

    fn expect_finish(&mut self, group: &'static str, handle: ChannelHandle, elapsed: f64) {
        self.pending.push(PendingFinish {
            due: elapsed + ONE_SHOT_LENGTH,
            group,
            handle,
        });
    }

    /// Let one-shot voices run out, skipping channels the pool has since recycled.
    fn finish_due(&mut self, manager: &AudioManager, backend: &SilentBackend, elapsed: f64) {
        self.pending.retain(|pending| {
            if pending.due > elapsed {
                return true;
            }
            if manager.channel(pending.handle).is_some() {
                if let Some(probe) = backend.probe(pending.group, pending.handle.slot()) {
                    probe.finish();
                }
            }
            false
        });
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// Log an engine event at a level matching its weight.
pub fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::ChannelStarted { group, handle, clip } => {
            debug!("[{group}] channel {} started {clip}", handle.slot());
        }
        EngineEvent::ChannelRecycled { group, handle, clip } => {
            info!("[{group}] channel {} recycled for {clip}", handle.slot());
        }
        EngineEvent::PlayRefused { group, clip } => {
            info!("[{group}] refused {clip}");
        }
        EngineEvent::ChannelFinished { group, handle } => {
            debug!("[{group}] channel {} finished", handle.slot());
        }
        EngineEvent::FadeCompleted { id, target } => {
            info!("Fade {} on {:?} completed", id.get(), target);
        }
        EngineEvent::GlobalVolumeChanged(volume) => {
            info!("Global volume set to {volume:.2}");
        }
        EngineEvent::GroupVolumeChanged { group, volume } => {
            info!("[{group}] volume set to {volume:.2}");
        }
    }
}
