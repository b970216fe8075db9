use crate::cpu::{CpuError, Flags, Registers, CPU};
use crate::interrupts::{self, InterruptFlags, IE_ADDR, IF_ADDR};
use crate::mmu::{BusError, FlatMemory, MemoryBus};
use pretty_assertions::assert_eq;

/// Creates a memory image with `program` at the cartridge entry point in a read-only ROM window.
fn create_test_memory(program: &[u8]) -> FlatMemory {
    let mut rom = vec![0; 0x8000];
    rom[0x100..0x100 + program.len()].copy_from_slice(program);
    FlatMemory::with_rom(&rom)
}

fn cpu_at_entry() -> CPU {
    let mut cpu = CPU::new().unwrap();
    cpu.regs.pc = 0x0100;
    cpu.regs.sp = 0xFFFE;
    cpu
}

#[test]
fn test_ld_b_immediate() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x06, 0x42]); // LD B, 0x42
    assert_eq!(cpu.step(&mut mem).unwrap(), 8);
    assert_eq!(cpu.regs.b, 0x42);
    assert_eq!(cpu.regs.pc, 0x0102);
}

#[test]
fn test_add_a_n() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xC6, 0x05]); // ADD A, 5
    cpu.regs.a = 3;
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.regs.a, 8);
    assert!(!cpu.regs.flag(Flags::ZERO));
}

#[test]
fn test_inc_b_half_carry() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x04]); // INC B
    cpu.regs.b = 0x0F;
    cpu.step(&mut mem).unwrap();
    assert_eq!(cpu.regs.b, 0x10);
    assert!(cpu.regs.flag(Flags::HALF_CARRY));
}

#[test]
fn test_add_hl_bc_preserves_zero() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x09]); // ADD HL, BC
    cpu.regs.f = Flags::ZERO;
    cpu.regs.set_hl(0x1000);
    cpu.regs.set_bc(0x2000);
    assert_eq!(cpu.step(&mut mem).unwrap(), 8);
    assert_eq!(cpu.regs.hl(), 0x3000);
    assert_eq!(cpu.regs.f, Flags::ZERO);
}

#[test]
fn test_prefixed_bit_h() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xCB, 0x7C]); // BIT 7, H
    assert_eq!(cpu.step(&mut mem).unwrap(), 8);
    assert!(cpu.regs.flag(Flags::ZERO));
    assert_eq!(cpu.regs.pc, 0x0102);
}

#[test]
fn test_illegal_opcode_keeps_state() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xDD]);
    let regs = cpu.regs;
    let clock = *cpu.clock();

    let err = cpu.step(&mut mem).unwrap_err();
    assert!(matches!(
        err,
        CpuError::IllegalOpcode {
            opcode: 0xDD,
            prefixed: false,
            pc: 0x0100
        }
    ));
    assert_eq!(
        err.to_string(),
        "Illegal opcode 0xDD (prefixed: false) at PC 0x0100"
    );
    assert_eq!(cpu.regs, regs);
    assert_eq!(*cpu.clock(), clock);
}

#[test]
fn test_rom_write_surfaces_bus_error() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x77]); // LD [HL], A
    cpu.regs.set_hl(0x0000);
    assert!(matches!(
        cpu.step(&mut mem),
        Err(CpuError::Bus(BusError::ReadOnly(0x0000)))
    ));
}

#[test]
fn test_failed_write_keeps_state_and_pending_ei() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xFB, 0x22, 0x00]); // EI; LD [HL+], A; NOP
    cpu.regs.set_hl(0x0000);
    cpu.regs.a = 0x5A;
    cpu.step(&mut mem).unwrap();
    let regs = cpu.regs;
    let clock = *cpu.clock();

    assert!(matches!(
        cpu.step(&mut mem),
        Err(CpuError::Bus(BusError::ReadOnly(0x0000)))
    ));
    assert_eq!(cpu.regs, regs);
    assert_eq!(cpu.regs.pc, 0x0101);
    assert_eq!(*cpu.clock(), clock);

    // Retried against writable memory, the store completes and the EI lands.
    cpu.regs.set_hl(0xC000);
    assert_eq!(cpu.step(&mut mem).unwrap(), 8);
    assert!(cpu.ime);
    assert_eq!(cpu.regs.hl(), 0xC001);
    assert_eq!(mem.read(0xC000), 0x5A);
}

#[test]
fn test_failed_push_restores_sp() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xC5]); // PUSH BC
    cpu.regs.sp = 0x0002;
    assert!(cpu.step(&mut mem).is_err());
    assert_eq!(cpu.regs.sp, 0x0002);
    assert_eq!(cpu.regs.pc, 0x0100);
}

#[test]
fn test_failed_dispatch_keeps_interrupt_pending() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x00]);
    cpu.ime = true;
    cpu.regs.sp = 0x0002;
    mem.write(IE_ADDR, InterruptFlags::VBLANK.bits()).unwrap();
    interrupts::request(&mut mem, InterruptFlags::VBLANK).unwrap();

    assert!(matches!(
        cpu.step(&mut mem),
        Err(CpuError::Bus(BusError::ReadOnly(0x0000)))
    ));
    assert!(cpu.ime);
    assert_eq!(cpu.regs.sp, 0x0002);
    assert_eq!(cpu.regs.pc, 0x0100);
    assert_eq!(interrupts::pending(&mem), InterruptFlags::VBLANK);
    assert_eq!(cpu.clock().total(), 0);
}

#[test]
fn test_ei_takes_effect_after_next_instruction() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xFB, 0x00, 0x00]); // EI; NOP; NOP
    mem.write(IE_ADDR, InterruptFlags::VBLANK.bits()).unwrap();
    interrupts::request(&mut mem, InterruptFlags::VBLANK).unwrap();

    assert_eq!(cpu.step(&mut mem).unwrap(), 4);
    assert!(!cpu.ime);

    // The pending VBlank is not taken before the NOP.
    assert_eq!(cpu.step(&mut mem).unwrap(), 4);
    assert!(cpu.ime);
    assert_eq!(cpu.regs.pc, 0x0102);

    assert_eq!(cpu.step(&mut mem).unwrap(), 20);
    assert_eq!(cpu.regs.pc, 0x0040);
    assert_eq!(cpu.regs.sp, 0xFFFC);
    assert_eq!(mem.read_word(0xFFFC), 0x0102);
    assert_eq!(mem.read(IF_ADDR) & InterruptFlags::VBLANK.bits(), 0);
    assert!(!cpu.ime);
}

#[test]
fn test_di_cancels_pending_ei() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xFB, 0xF3, 0x00]); // EI; DI; NOP
    for _ in 0..3 {
        cpu.step(&mut mem).unwrap();
    }
    assert!(!cpu.ime);
}

#[test]
fn test_interrupt_priority_dispatch() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x00]);
    cpu.ime = true;
    mem.write(IE_ADDR, 0x1F).unwrap();
    interrupts::request(&mut mem, InterruptFlags::JOYPAD | InterruptFlags::TIMER).unwrap();

    assert_eq!(cpu.step(&mut mem).unwrap(), 20);
    assert_eq!(cpu.regs.pc, 0x0050);
    assert_eq!(interrupts::pending(&mem), InterruptFlags::JOYPAD);
}

#[test]
fn test_halt_wakes_without_ime() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x76, 0x04]); // HALT; INC B
    mem.write(IE_ADDR, InterruptFlags::TIMER.bits()).unwrap();

    assert_eq!(cpu.step(&mut mem).unwrap(), 4);
    assert!(cpu.halted);
    assert_eq!(cpu.step(&mut mem).unwrap(), 4);
    assert_eq!(cpu.regs.pc, 0x0101);

    interrupts::request(&mut mem, InterruptFlags::TIMER).unwrap();
    assert_eq!(cpu.step(&mut mem).unwrap(), 4);
    assert!(!cpu.halted);
    assert_eq!(cpu.regs.b, 1);
    // Without IME the request stays pending.
    assert_eq!(interrupts::pending(&mem), InterruptFlags::TIMER);
}

#[test]
fn test_reti_enables_immediately() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0xD9]); // RETI
    cpu.regs.sp = 0xFFFC;
    mem.write_word(0xFFFC, 0x0150).unwrap();

    assert_eq!(cpu.step(&mut mem).unwrap(), 16);
    assert!(cpu.ime);
    assert_eq!(cpu.regs.pc, 0x0150);
    assert_eq!(cpu.regs.sp, 0xFFFE);
}

#[test]
fn test_stop_idles_until_reset() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x10, 0x00, 0x04]); // STOP; INC B
    cpu.step(&mut mem).unwrap();
    assert!(cpu.stopped);
    assert_eq!(cpu.regs.pc, 0x0102);

    assert_eq!(cpu.step(&mut mem).unwrap(), 4);
    assert_eq!(cpu.regs.pc, 0x0102);
    assert_eq!(cpu.regs.b, 0);

    cpu.reset();
    assert!(!cpu.stopped);
}

#[test]
fn test_run_frame_budget() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x18, 0xFE]); // JR -2
    let elapsed = cpu.run_frame(&mut mem).unwrap();
    assert!(elapsed >= crate::clock::CYCLES_PER_FRAME);
    assert!(elapsed < crate::clock::CYCLES_PER_FRAME + 12);
    assert_eq!(cpu.clock().total(), u64::from(elapsed));
    assert_eq!(cpu.regs.pc, 0x0100);
}

#[test]
fn test_cycle_counter_integrates() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x00, 0x00, 0x00]);
    for _ in 0..3 {
        cpu.step(&mut mem).unwrap();
    }
    assert_eq!(cpu.clock().total(), 12);
    assert_eq!(cpu.clock().instructions(), 3);
}

#[test]
fn test_reset_restores_post_boot() {
    let mut cpu = cpu_at_entry();
    let mut mem = create_test_memory(&[0x06, 0x42, 0xFB, 0x00]);
    cpu.step(&mut mem).unwrap();
    cpu.step(&mut mem).unwrap();
    cpu.reset();
    assert_eq!(cpu.regs, Registers::post_boot());
    assert_eq!(cpu.clock().total(), 0);
    assert!(!cpu.ime);

    // The EI from before the reset does not leak through.
    cpu.regs.pc = 0x0103;
    cpu.step(&mut mem).unwrap();
    assert!(!cpu.ime);
}

#[test]
fn test_post_boot_constructor() {
    let cpu = CPU::post_boot().unwrap();
    assert_eq!(cpu.regs.pc, 0x0100);
    assert_eq!(cpu.regs.sp, 0xFFFE);
    assert!(!cpu.halted);
    assert!(std::ptr::eq(cpu.table(), crate::cpu::table().unwrap()));
}
