//! Ejecución topológica concurrente de una fase DAG.
//!
//! Un pool acotado de workers toma steps elegibles de una ready-queue
//! dinámica: un step entra en cuanto todas sus dependencias terminaron, sin
//! barreras por profundidad ni polling. La señalización es por condvar.
//!
//! Aislamiento de fallas: un step que falla marca como salteado a todo su
//! subárbol de dependientes; las ramas independientes siguen hasta terminar
//! y todas las fallas acumuladas se devuelven juntas al final de la fase.

use std::collections::{HashMap, VecDeque};
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::errors::{StepError, StepFailure};
use crate::logger::FlowLogger;

/// Un nodo del DAG ya filtrado por exclusión: nombre, dependencias (sólo
/// nombres habilitados de la misma fase) y el cuerpo a ejecutar.
pub(crate) struct DagJob<'run> {
    pub name: String,
    pub depends_on: Vec<String>,
    pub run: Box<dyn Fn() -> Result<(), StepError> + Send + Sync + 'run>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Waiting,
    Ready,
    Running,
    Done,
    Failed,
    Skipped,
}

struct PoolState {
    node_state: Vec<NodeState>,
    /// Dependencias aún no terminadas, por nodo.
    blockers: Vec<usize>,
    ready: VecDeque<usize>,
    /// Nodos que todavía no llegaron a un estado terminal.
    outstanding: usize,
    failures: Vec<StepFailure>,
}

/// Corre los jobs con un pool de `num_threads` workers y devuelve las fallas
/// acumuladas de la fase. Las dependencias ya deben estar registradas (el
/// flow valida nombres al registrar, lo que además garantiza aciclicidad).
pub(crate) fn run_pool(jobs: &[DagJob<'_>],
                       num_threads: usize,
                       logger: &FlowLogger)
                       -> Vec<StepFailure> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let index: HashMap<&str, usize> =
        jobs.iter().enumerate().map(|(i, j)| (j.name.as_str(), i)).collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); jobs.len()];
    let mut blockers = vec![0usize; jobs.len()];
    for (i, job) in jobs.iter().enumerate() {
        for dep in &job.depends_on {
            let d = index[dep.as_str()];
            dependents[d].push(i);
            blockers[i] += 1;
        }
    }

    let mut node_state = vec![NodeState::Waiting; jobs.len()];
    let mut ready = VecDeque::new();
    for (i, &b) in blockers.iter().enumerate() {
        if b == 0 {
            node_state[i] = NodeState::Ready;
            ready.push_back(i);
        }
    }

    let state = Mutex::new(PoolState { node_state,
                                       blockers,
                                       ready,
                                       outstanding: jobs.len(),
                                       failures: Vec::new() });
    let ready_cv = Condvar::new();

    thread::scope(|scope| {
        for worker_id in 0..num_threads {
            let state = &state;
            let ready_cv = &ready_cv;
            let dependents = &dependents;
            scope.spawn(move || {
                worker_loop(worker_id, jobs, dependents, state, ready_cv, logger);
            });
        }
    });

    state.into_inner().failures
}

fn worker_loop(worker_id: usize,
               jobs: &[DagJob<'_>],
               dependents: &[Vec<usize>],
               state: &Mutex<PoolState>,
               ready_cv: &Condvar,
               logger: &FlowLogger) {
    loop {
        let job_idx = {
            let mut st = state.lock();
            loop {
                if let Some(i) = st.ready.pop_front() {
                    st.node_state[i] = NodeState::Running;
                    break i;
                }
                if st.outstanding == 0 {
                    return;
                }
                ready_cv.wait(&mut st);
            }
        };

        logger.flow(&format!("Running {} on worker {}", jobs[job_idx].name, worker_id));
        let result = (jobs[job_idx].run)();

        let mut st = state.lock();
        st.outstanding -= 1;
        match result {
            Ok(()) => {
                st.node_state[job_idx] = NodeState::Done;
                for &child in &dependents[job_idx] {
                    st.blockers[child] -= 1;
                    if st.blockers[child] == 0 && st.node_state[child] == NodeState::Waiting {
                        st.node_state[child] = NodeState::Ready;
                        st.ready.push_back(child);
                    }
                }
            }
            Err(error) => {
                st.node_state[job_idx] = NodeState::Failed;
                logger.error(&format!("{} failed: {}", jobs[job_idx].name, error));
                st.failures.push(StepFailure { step: jobs[job_idx].name.clone(),
                                               error });

                // Saltea transitivamente el subárbol de dependientes
                let mut stack: Vec<usize> = dependents[job_idx].clone();
                while let Some(child) = stack.pop() {
                    if st.node_state[child] == NodeState::Waiting {
                        st.node_state[child] = NodeState::Skipped;
                        st.outstanding -= 1;
                        logger.flow(&format!("Skipping {}: a dependency failed",
                                             jobs[child].name));
                        stack.extend(dependents[child].iter().copied());
                    }
                }
            }
        }
        // Despierta tanto a los que esperan trabajo como a los que deben salir
        ready_cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn job<'run>(name: &str,
                 deps: &[&str],
                 body: impl Fn() -> Result<(), StepError> + Send + Sync + 'run)
                 -> DagJob<'run> {
        DagJob { name: name.to_string(),
                 depends_on: deps.iter().map(|d| d.to_string()).collect(),
                 run: Box::new(body) }
    }

    #[test]
    fn all_independent_jobs_run_once() {
        let counter = AtomicUsize::new(0);
        let logger = FlowLogger::new("test");
        let jobs: Vec<DagJob<'_>> = (0..8).map(|i| {
                                                  let counter = &counter;
                                                  job(&format!("j{i}"), &[], move || {
                                                      counter.fetch_add(1, Ordering::SeqCst);
                                                      Ok(())
                                                  })
                                              })
                                              .collect();

        let failures = run_pool(&jobs, 3, &logger);
        assert!(failures.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn dependencies_complete_before_dependents_start() {
        // a -> b -> c, más una rama d independiente
        let order = PlMutex::new(Vec::new());
        let logger = FlowLogger::new("test");
        let push = |name: &'static str| {
            let order = &order;
            move || {
                order.lock().push(name);
                Ok(())
            }
        };
        let jobs = vec![job("a", &[], push("a")),
                        job("b", &["a"], push("b")),
                        job("c", &["b"], push("c")),
                        job("d", &[], push("d"))];

        let failures = run_pool(&jobs, 4, &logger);
        assert!(failures.is_empty());

        let order = order.lock();
        let pos = |n: &str| order.iter().position(|x| *x == n).expect("ran");
        assert!(pos("a") < pos("b"), "a must finish before b starts");
        assert!(pos("b") < pos("c"), "b must finish before c starts");
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn failure_skips_dependent_subtree_but_not_independent_branches() {
        let ran = PlMutex::new(Vec::new());
        let logger = FlowLogger::new("test");
        let mark = |name: &'static str| {
            let ran = &ran;
            move || {
                ran.lock().push(name);
                Ok(())
            }
        };
        // bad -> mid -> leaf se saltean; other y second_fail corren igual
        let jobs = vec![job("bad", &[], || Err(StepError::Failed("boom".to_string()))),
                        job("mid", &["bad"], mark("mid")),
                        job("leaf", &["mid"], mark("leaf")),
                        job("other", &[], mark("other")),
                        job("second_fail", &[], || {
                            Err(StepError::Failed("also boom".to_string()))
                        })];

        let failures = run_pool(&jobs, 2, &logger);

        let ran = ran.lock();
        assert_eq!(*ran, vec!["other"], "only the independent branch may run");
        // Las dos fallas se reportan juntas al final de la fase
        assert_eq!(failures.len(), 2);
        let mut failed: Vec<&str> = failures.iter().map(|f| f.step.as_str()).collect();
        failed.sort_unstable();
        assert_eq!(failed, vec!["bad", "second_fail"]);
    }

    #[test]
    fn single_worker_pool_still_drains_the_graph() {
        let counter = AtomicUsize::new(0);
        let logger = FlowLogger::new("test");
        let jobs = vec![job("a", &[], || Ok(())),
                        job("b", &["a"], {
                            let counter = &counter;
                            move || {
                                counter.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        }),
                        job("c", &["a", "b"], {
                            let counter = &counter;
                            move || {
                                counter.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        })];

        let failures = run_pool(&jobs, 1, &logger);
        assert!(failures.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
