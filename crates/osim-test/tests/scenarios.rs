use std::sync::Arc;
use std::time::Duration;

use osim_kernel::{Algorithm, BlockReason, InterruptReason, KernelError, MemoryVerdict, Queue};
use osim_kernel::{Pid, Syscall, Tid};
use osim_test::{fake_kernel, id, CpuEvent, MemoryCall};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn create_thread(priority: u32) -> Syscall {
    Syscall::ThreadCreate {
        path: "worker".into(),
        priority,
    }
}

fn create_process(size: u32, priority: u32) -> Syscall {
    Syscall::ProcessCreate {
        path: "child".into(),
        size,
        priority,
    }
}

fn lock(name: &str) -> Syscall {
    Syscall::MutexLock { name: name.into() }
}

fn unlock(name: &str) -> Syscall {
    Syscall::MutexUnlock { name: name.into() }
}

fn preempted() -> Syscall {
    Syscall::Preempted {
        reason: "Quantum".into(),
    }
}

/// Lets every runnable task finish its work before the clock moves.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test]
async fn created_process_is_dispatched_when_alone() {
    init_logger();
    let (kernel, memory, cpu) = fake_kernel(Algorithm::Fifo);

    let pid = kernel.bootstrap("init", 32).await.unwrap();
    assert_eq!(pid, Pid::new(1));
    assert_eq!(kernel.snapshot().state_of(id(1, 0)), Some(Queue::Ready));

    assert!(kernel.dispatch_once().await);
    assert_eq!(kernel.snapshot().executing, Some(id(1, 0)));
    assert_eq!(cpu.events(), vec![CpuEvent::Dispatch(id(1, 0))]);
    assert_eq!(
        memory.calls(),
        vec![
            MemoryCall::CreateProcess { pid, size: 32 },
            MemoryCall::CreateThread(id(1, 0), "init".into()),
        ]
    );
    assert!(!kernel.dispatch_once().await);
}

#[tokio::test]
async fn lowest_priority_value_is_dispatched_first() {
    init_logger();
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Priority);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;

    let main = id(1, 0);
    kernel.handle_syscall(main, create_thread(5)).await.unwrap();
    kernel.handle_syscall(main, create_thread(1)).await.unwrap();
    kernel.handle_syscall(main, Syscall::ThreadExit).await.unwrap();

    assert!(kernel.dispatch_once().await);
    assert_eq!(kernel.snapshot().executing, Some(id(1, 2)));
    assert_eq!(cpu.dispatched().last(), Some(&id(1, 2)));
}

#[tokio::test]
async fn unlock_hands_mutex_to_waiter() {
    init_logger();
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let (t1, t2) = (id(1, 0), id(1, 1));

    kernel.handle_syscall(t1, create_thread(0)).await.unwrap();
    kernel
        .handle_syscall(t1, Syscall::MutexCreate { name: "m".into() })
        .await
        .unwrap();

    // A lock that does not block hands the CPU straight back to the caller.
    cpu.clear();
    kernel.handle_syscall(t1, lock("m")).await.unwrap();
    assert_eq!(cpu.events(), vec![CpuEvent::Dispatch(t1)]);

    cpu.clear();
    kernel.handle_syscall(t1, lock("nope")).await.unwrap();
    assert_eq!(cpu.events(), vec![CpuEvent::Dispatch(t1)]);
    assert_eq!(kernel.snapshot().executing, Some(t1));

    kernel.handle_syscall(t1, preempted()).await.unwrap();

    kernel.dispatch_once().await;
    kernel.handle_syscall(t2, lock("m")).await.unwrap();
    assert_eq!(
        kernel.snapshot().state_of(t2),
        Some(Queue::Blocked(BlockReason::Mutex))
    );

    kernel.dispatch_once().await;
    assert_eq!(kernel.snapshot().executing, Some(t1));
    kernel.handle_syscall(t1, unlock("m")).await.unwrap();

    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.state_of(t2), Some(Queue::Ready));
    let m = snapshot.mutex(Pid::new(1), "m").unwrap();
    assert_eq!(m.owner, Some(Tid::new(1)));
    assert!(m.waiters.is_empty());
}

#[tokio::test]
async fn join_wakes_when_target_exits() {
    init_logger();
    let (kernel, memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let (t1, t2) = (id(1, 0), id(1, 1));

    kernel.handle_syscall(t1, create_thread(0)).await.unwrap();
    kernel
        .handle_syscall(t1, Syscall::ThreadJoin { target: t2.tid })
        .await
        .unwrap();
    assert_eq!(
        kernel.snapshot().state_of(t1),
        Some(Queue::Blocked(BlockReason::Join))
    );

    kernel.dispatch_once().await;
    kernel.handle_syscall(t2, Syscall::ThreadExit).await.unwrap();

    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.state_of(t2), Some(Queue::Exited));
    assert_eq!(snapshot.state_of(t1), Some(Queue::Ready));
    assert_eq!(memory.calls().last(), Some(&MemoryCall::TerminateThread(t2)));
}

#[tokio::test]
async fn join_on_finished_thread_resumes_caller() {
    init_logger();
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    cpu.clear();

    kernel
        .handle_syscall(id(1, 0), Syscall::ThreadJoin { target: Tid::new(4) })
        .await
        .unwrap();
    assert_eq!(kernel.snapshot().executing, Some(id(1, 0)));
    assert_eq!(cpu.events(), vec![CpuEvent::Dispatch(id(1, 0))]);
}

#[tokio::test(start_paused = true)]
async fn compaction_pauses_dispatch_then_retries_admission() {
    init_logger();
    let (kernel, memory, cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    memory.push_verdicts([MemoryVerdict::NeedsCompaction, MemoryVerdict::HasSpace]);
    let hold = memory.hold_compaction();

    let creator = {
        let kernel = Arc::clone(&kernel);
        tokio::spawn(async move { kernel.handle_syscall(id(1, 0), create_process(64, 0)).await })
    };
    settle().await;
    tokio::spawn(Arc::clone(&kernel).run_dispatcher());
    settle().await;

    let snapshot = kernel.snapshot();
    assert!(!snapshot.compaction_gate_open);
    assert_eq!(snapshot.executing, None);
    assert_eq!(snapshot.ready, vec![id(1, 0)]);
    assert!(cpu.dispatched().is_empty());

    hold.notify_one();
    creator.await.unwrap().unwrap();
    settle().await;

    let snapshot = kernel.snapshot();
    assert!(snapshot.compaction_gate_open);
    assert_eq!(snapshot.executing, Some(id(1, 0)));
    assert_eq!(snapshot.initialized, vec![Pid::new(1), Pid::new(2)]);
    let pid = Pid::new(2);
    assert_eq!(
        memory.calls()[2..],
        [
            MemoryCall::CreateProcess { pid, size: 64 },
            MemoryCall::Compact,
            MemoryCall::CreateProcess { pid, size: 64 },
            MemoryCall::CreateThread(id(2, 0), "child".into()),
        ]
    );
}

#[tokio::test]
async fn process_exit_releases_mutexes_of_every_thread() {
    init_logger();
    let (kernel, memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let (owner, waiter) = (id(1, 0), id(1, 1));

    kernel.handle_syscall(owner, create_thread(0)).await.unwrap();
    kernel
        .handle_syscall(owner, Syscall::MutexCreate { name: "m".into() })
        .await
        .unwrap();
    kernel.handle_syscall(owner, lock("m")).await.unwrap();
    kernel.handle_syscall(owner, preempted()).await.unwrap();
    kernel.dispatch_once().await;
    kernel.handle_syscall(waiter, lock("m")).await.unwrap();
    kernel.dispatch_once().await;

    kernel
        .handle_syscall(owner, Syscall::ProcessExit)
        .await
        .unwrap();

    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.exited, vec![owner, waiter]);
    assert!(snapshot.ready.is_empty() && snapshot.blocked.is_empty());
    assert_eq!(snapshot.exited_processes, vec![Pid::new(1)]);
    assert_eq!(
        memory.calls()[3..],
        [
            MemoryCall::TerminateThread(owner),
            MemoryCall::TerminateThread(waiter),
            MemoryCall::TerminateProcess(Pid::new(1)),
        ]
    );
}

#[tokio::test]
async fn higher_priority_arrival_interrupts_once() {
    init_logger();
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Priority);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;

    kernel
        .handle_syscall(id(1, 0), create_process(16, 5))
        .await
        .unwrap();
    kernel
        .handle_syscall(id(1, 0), Syscall::ThreadExit)
        .await
        .unwrap();
    kernel.dispatch_once().await;
    let running = id(2, 0);
    assert_eq!(kernel.snapshot().executing, Some(running));

    kernel.handle_syscall(running, create_thread(1)).await.unwrap();
    kernel.handle_syscall(running, create_thread(0)).await.unwrap();
    assert_eq!(
        cpu.interrupts(),
        vec![(running, InterruptReason::Priority)]
    );

    kernel
        .handle_syscall(running, Syscall::Preempted {
            reason: "Prioridades".into(),
        })
        .await
        .unwrap();
    kernel.dispatch_once().await;
    assert_eq!(kernel.snapshot().executing, Some(id(2, 2)));
}

#[tokio::test]
async fn multilevel_interrupts_on_priority_before_quantum() {
    init_logger();
    let quantum = Duration::from_secs(60);
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Multilevel { quantum });
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;

    kernel
        .handle_syscall(id(1, 0), create_process(16, 3))
        .await
        .unwrap();
    kernel
        .handle_syscall(id(1, 0), Syscall::ThreadExit)
        .await
        .unwrap();
    kernel.dispatch_once().await;
    let running = id(2, 0);
    assert_eq!(kernel.snapshot().executing, Some(running));
    assert!(cpu.interrupts().is_empty());

    kernel.handle_syscall(running, create_thread(1)).await.unwrap();
    assert_eq!(
        cpu.interrupts(),
        vec![(running, InterruptReason::Priority)]
    );
}

#[tokio::test]
async fn fifo_never_interrupts() {
    init_logger();
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;

    kernel.handle_syscall(id(1, 0), create_thread(0)).await.unwrap();
    assert!(cpu.interrupts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn quantum_expiry_interrupts_running_thread() {
    init_logger();
    let quantum = Duration::from_millis(100);
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Multilevel { quantum });
    kernel.bootstrap("init", 32).await.unwrap();
    tokio::spawn(Arc::clone(&kernel).run_dispatcher());
    settle().await;
    let main = id(1, 0);
    assert_eq!(kernel.snapshot().executing, Some(main));

    tokio::time::sleep(Duration::from_millis(97)).await;
    assert!(cpu.interrupts().is_empty());
    tokio::time::sleep(Duration::from_millis(3)).await;
    assert_eq!(cpu.interrupts(), vec![(main, InterruptReason::Quantum)]);

    kernel.handle_syscall(main, preempted()).await.unwrap();
    settle().await;
    assert_eq!(cpu.dispatched(), vec![main, main]);
    assert_eq!(cpu.interrupts().len(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cpu.interrupts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_quantum_does_not_interrupt_redispatch() {
    init_logger();
    let quantum = Duration::from_millis(100);
    let (kernel, _memory, cpu) = fake_kernel(Algorithm::Multilevel { quantum });
    kernel.bootstrap("init", 32).await.unwrap();
    tokio::spawn(Arc::clone(&kernel).run_dispatcher());
    settle().await;
    let main = id(1, 0);

    tokio::time::sleep(Duration::from_millis(30)).await;
    kernel
        .handle_syscall(main, Syscall::Io {
            duration: Duration::from_millis(10),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(15)).await;
    assert_eq!(cpu.dispatched(), vec![main, main]);

    // The first dispatch's timer fires around t=100 while the second runs.
    tokio::time::sleep(Duration::from_millis(70)).await;
    assert!(cpu.interrupts().is_empty());
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(cpu.interrupts(), vec![(main, InterruptReason::Quantum)]);
}

#[tokio::test(start_paused = true)]
async fn io_wait_ends_after_its_duration() {
    init_logger();
    let (kernel, _memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let main = id(1, 0);

    kernel
        .handle_syscall(main, Syscall::Io {
            duration: Duration::from_millis(500),
        })
        .await
        .unwrap();
    assert_eq!(
        kernel.snapshot().state_of(main),
        Some(Queue::Blocked(BlockReason::Io))
    );

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(
        kernel.snapshot().state_of(main),
        Some(Queue::Blocked(BlockReason::Io))
    );
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(kernel.snapshot().state_of(main), Some(Queue::Ready));
}

#[tokio::test]
async fn admission_is_fifo_and_no_space_waits_for_an_exit() {
    init_logger();
    let (kernel, memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let main = id(1, 0);

    memory.push_verdicts([MemoryVerdict::NoSpace]);
    kernel.handle_syscall(main, create_process(512, 0)).await.unwrap();
    kernel.handle_syscall(main, create_process(8, 0)).await.unwrap();

    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.pending, vec![Pid::new(2), Pid::new(3)]);
    assert_eq!(snapshot.initialized, vec![Pid::new(1)]);
    let asked: Vec<Pid> = memory
        .calls()
        .iter()
        .filter_map(|c| match c {
            MemoryCall::CreateProcess { pid, .. } => Some(*pid),
            _ => None,
        })
        .collect();
    assert_eq!(asked, vec![Pid::new(1), Pid::new(2)]);

    kernel.handle_syscall(main, Syscall::ProcessExit).await.unwrap();
    let snapshot = kernel.snapshot();
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.initialized, vec![Pid::new(2), Pid::new(3)]);
    assert_eq!(snapshot.ready, vec![id(2, 0), id(3, 0)]);
}

#[tokio::test]
async fn dump_memory_outcomes() {
    init_logger();
    let (kernel, memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let main = id(1, 0);

    kernel.handle_syscall(main, Syscall::DumpMemory).await.unwrap();
    assert_eq!(kernel.snapshot().state_of(main), Some(Queue::Ready));

    kernel.dispatch_once().await;
    memory.set_dump_result(false);
    kernel.handle_syscall(main, Syscall::DumpMemory).await.unwrap();
    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.state_of(main), Some(Queue::Exited));
    assert_eq!(snapshot.exited_processes, vec![Pid::new(1)]);
}

#[tokio::test]
async fn unavailable_memory_leaves_dumping_thread_blocked() {
    init_logger();
    let (kernel, memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let main = id(1, 0);

    memory.set_unavailable(true);
    let err = kernel
        .handle_syscall(main, Syscall::DumpMemory)
        .await
        .unwrap_err();
    assert!(matches!(err, KernelError::Peer(_)));
    assert_eq!(
        kernel.snapshot().state_of(main),
        Some(Queue::Blocked(BlockReason::DumpMemory))
    );
}

#[tokio::test]
async fn segmentation_fault_ends_the_process() {
    init_logger();
    let (kernel, memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    kernel.handle_syscall(id(1, 0), create_thread(3)).await.unwrap();

    kernel
        .handle_syscall(id(1, 1), Syscall::SegmentationFault)
        .await
        .unwrap();
    let snapshot = kernel.snapshot();
    assert_eq!(snapshot.exited, vec![id(1, 1), id(1, 0)]);
    assert_eq!(
        memory.calls().last(),
        Some(&MemoryCall::TerminateProcess(Pid::new(1)))
    );
}

#[tokio::test]
async fn cancel_finishes_target_and_resumes_caller() {
    init_logger();
    let (kernel, memory, cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();
    kernel.dispatch_once().await;
    let main = id(1, 0);
    kernel.handle_syscall(main, create_thread(0)).await.unwrap();
    cpu.clear();

    kernel
        .handle_syscall(main, Syscall::ThreadCancel { target: Tid::new(1) })
        .await
        .unwrap();
    assert_eq!(kernel.snapshot().state_of(id(1, 1)), Some(Queue::Exited));
    assert_eq!(cpu.events(), vec![CpuEvent::Dispatch(main)]);
    assert_eq!(memory.calls().last(), Some(&MemoryCall::TerminateThread(id(1, 1))));

    let err = kernel
        .handle_syscall(main, Syscall::ThreadCancel { target: Tid::new(1) })
        .await
        .unwrap_err();
    assert!(matches!(err, KernelError::ThreadNotFound(_)));
    assert_eq!(cpu.events().len(), 2);
}

#[tokio::test]
async fn blocking_syscall_from_idle_thread_is_rejected() {
    init_logger();
    let (kernel, _memory, _cpu) = fake_kernel(Algorithm::Fifo);
    kernel.bootstrap("init", 32).await.unwrap();

    let err = kernel
        .handle_syscall(id(1, 0), Syscall::Io {
            duration: Duration::from_millis(5),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, KernelError::UnexpectedState { .. }));
    assert_eq!(kernel.snapshot().state_of(id(1, 0)), Some(Queue::Ready));
}
